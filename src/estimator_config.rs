use serde::{Deserialize, Serialize};

/// Upper bound accepted by [`EstimatorConfig::new`].
pub const MAX_PAGES_PER_CHAPTER: f64 = 1000.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorConfig {
    pub pages_per_chapter: f64,
    pub verses_per_page: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            pages_per_chapter: 1.5,
            verses_per_page: 25,
        }
    }
}

impl EstimatorConfig {
    pub fn new(pages_per_chapter: f64, verses_per_page: u32) -> Self {
        EstimatorConfig {
            pages_per_chapter: if pages_per_chapter.is_finite() {
                pages_per_chapter.clamp(0.0, MAX_PAGES_PER_CHAPTER)
            } else {
                0.0
            },
            verses_per_page: verses_per_page.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_degenerate_values() {
        let config = EstimatorConfig::new(-2.0, 0);
        assert_eq!(config.pages_per_chapter, 0.0);
        assert_eq!(config.verses_per_page, 1);

        let config = EstimatorConfig::new(f64::NAN, 30);
        assert_eq!(config.pages_per_chapter, 0.0);
        assert_eq!(config.verses_per_page, 30);

        let config = EstimatorConfig::new(1e10, 25);
        assert_eq!(config.pages_per_chapter, MAX_PAGES_PER_CHAPTER);
        assert_eq!(EstimatorConfig::new(2.25, 25).pages_per_chapter, 2.25);
    }
}
