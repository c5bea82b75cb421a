//! Human-like page interaction performed around navigation in the scrape tier.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use kpix_core::SimulationLevel;
use rand::Rng;
use tracing::debug;

/// Hooks invoked around a profile page visit. Injected so extractors can be
/// tested without a browser and so the behaviour stays swappable per platform.
#[async_trait]
pub trait PageInteraction: Send + Sync {
    /// Runs after the lease is created but before navigation starts.
    async fn before_navigate(&self, page: &Page);

    /// Runs once the profile page has loaded, before any data is read.
    async fn after_load(&self, page: &Page);
}

/// Interaction hook that does nothing. Used in tests and when simulation is
/// disabled outright.
pub struct NoInteraction;

#[async_trait]
impl PageInteraction for NoInteraction {
    async fn before_navigate(&self, _page: &Page) {}

    async fn after_load(&self, _page: &Page) {}
}

/// Scrolls, mouse movement and reading pauses scaled by the configured level.
///
/// All interaction goes through `page.evaluate`; failures are logged and
/// ignored since the simulation is cosmetic.
pub struct HumanSimulation {
    level: SimulationLevel,
}

impl HumanSimulation {
    #[must_use]
    pub fn new(level: SimulationLevel) -> Self {
        Self { level }
    }

    fn scroll_passes(&self) -> u32 {
        match self.level {
            SimulationLevel::Low => 1,
            SimulationLevel::Medium => 3,
            SimulationLevel::High => 5,
        }
    }

    async fn eval(page: &Page, script: String) {
        if let Err(err) = page.evaluate(script).await {
            debug!("interaction script skipped: {err}");
        }
    }

    /// Scroll down in uneven steps with short reading pauses, the way a
    /// person skims a profile page.
    async fn scroll_through(&self, page: &Page) {
        for _ in 0..self.scroll_passes() {
            let (distance, pause_ms) = {
                let mut rng = rand::rng();
                (rng.random_range(200..700), rng.random_range(400..1500))
            };
            Self::eval(page, format!("window.scrollBy(0, {distance})")).await;
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }

        // occasionally scroll back up a bit
        let back_up = {
            let mut rng = rand::rng();
            if rng.random_bool(0.3) {
                Some(rng.random_range(200..500))
            } else {
                None
            }
        };
        if let Some(distance) = back_up {
            Self::eval(page, format!("window.scrollBy(0, -{distance})")).await;
        }
    }

    /// Dispatch a few synthetic mousemove events along random points.
    async fn wiggle_mouse(&self, page: &Page) {
        if self.level == SimulationLevel::Low {
            return;
        }
        let moves = if self.level == SimulationLevel::High { 4 } else { 2 };
        for _ in 0..moves {
            let (x, y, pause_ms) = {
                let mut rng = rand::rng();
                (
                    rng.random_range(50..1200),
                    rng.random_range(50..700),
                    rng.random_range(80..300),
                )
            };
            let script = format!(
                "document.dispatchEvent(new MouseEvent('mousemove', \
                 {{ clientX: {x}, clientY: {y}, bubbles: true }}))"
            );
            Self::eval(page, script).await;
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }
    }
}

#[async_trait]
impl PageInteraction for HumanSimulation {
    async fn before_navigate(&self, _page: &Page) {
        // short think-time before the address bar "hits enter"
        let pause_ms = rand::rng().random_range(100..600);
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }

    async fn after_load(&self, page: &Page) {
        self.wiggle_mouse(page).await;
        self.scroll_through(page).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_passes_scale_with_level() {
        assert_eq!(HumanSimulation::new(SimulationLevel::Low).scroll_passes(), 1);
        assert_eq!(
            HumanSimulation::new(SimulationLevel::Medium).scroll_passes(),
            3
        );
        assert_eq!(
            HumanSimulation::new(SimulationLevel::High).scroll_passes(),
            5
        );
    }
}
