use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::config::MatcherConfig;
use crate::detected_points::InterestPoint;

/// Pairs interest points of two images by descriptor similarity.
pub trait Matcher {
    /// Returns `(left index, right index)` pairs.
    fn match_points(&self, left: &[InterestPoint], right: &[InterestPoint]) -> Vec<(usize, usize)>;
}

/// Brute-force L2 matcher with a best/second-best ratio test.
#[derive(Debug, Clone, Default)]
pub struct RatioMatcher {
    config: MatcherConfig,
}

impl RatioMatcher {
    pub fn new(config: MatcherConfig) -> RatioMatcher {
        RatioMatcher { config }
    }

    pub fn ratio(&self) -> f64 {
        self.config.ratio
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template("    Matching: [{bar:40}] {pos}/{len}") {
            bar.set_style(style);
        }
        bar
    }
}

fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

impl Matcher for RatioMatcher {
    fn match_points(&self, left: &[InterestPoint], right: &[InterestPoint]) -> Vec<(usize, usize)> {
        let bar = self.progress_bar(left.len());
        let mut pairs = Vec::new();
        for (li, lp) in left.iter().enumerate() {
            bar.inc(1);
            let mut best = (f64::MAX, usize::MAX);
            let mut second = f64::MAX;
            for (ri, rp) in right.iter().enumerate() {
                if rp.descriptor.len() != lp.descriptor.len() {
                    continue;
                }
                let d = l2_distance(&lp.descriptor, &rp.descriptor);
                if d < best.0 {
                    second = best.0;
                    best = (d, ri);
                } else if d < second {
                    second = d;
                }
            }
            if best.1 != usize::MAX && second < f64::MAX && best.0 < self.config.ratio * second {
                pairs.push((li, best.1));
            }
        }
        bar.finish_and_clear();
        log::debug!(
            "ratio test kept {} of {} candidates",
            pairs.len(),
            left.len()
        );
        pairs
    }
}
