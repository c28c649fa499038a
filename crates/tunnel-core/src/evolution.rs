use crate::constants::*;
use crate::geometry::TunnelConfig;
use crate::quality::DeviceClass;
use crate::theme::Theme;

/// Cumulative tunnel growth driven by milestones.
///
/// Every `LINKS_PER_MILESTONE`-th link within a theme adds twist (capped) and
/// rings (capped per device class). The config is updated even when the
/// rebuild itself is debounced away, so the next rebuild reflects everything.
#[derive(Clone, Debug)]
pub struct TunnelEvolution {
    config: TunnelConfig,
    twist_cap: f32,
    ring_cap: u32,
}

impl TunnelEvolution {
    pub fn new(config: TunnelConfig, device: DeviceClass) -> Self {
        let ring_cap = device.max_rings().max(config.rings);
        Self {
            twist_cap: TWIST_CAP.max(config.base_twist),
            ring_cap,
            config,
        }
    }

    pub fn config(&self) -> &TunnelConfig {
        &self.config
    }

    /// Apply a milestone; returns true when the geometry changed and a
    /// rebuild should be requested.
    pub fn apply(&mut self, theme: Theme, level: u32, theme_links: u32) -> bool {
        if theme_links == 0 || theme_links % LINKS_PER_MILESTONE != 0 {
            log::debug!(
                "[engine] {} milestone at {} links is off-cycle, ignoring",
                theme,
                theme_links
            );
            return false;
        }
        let twist = (self.config.base_twist + TWIST_STEP).min(self.twist_cap);
        let rings = (self.config.rings + RING_STEP).min(self.ring_cap);
        if twist == self.config.base_twist && rings == self.config.rings {
            log::debug!("[engine] tunnel already at its caps");
            return false;
        }
        self.config.base_twist = twist;
        self.config.rings = rings;
        log::info!(
            "[engine] evolve theme={} level={} -> twist={:.2} rings={}",
            theme,
            level,
            twist,
            rings
        );
        true
    }
}
