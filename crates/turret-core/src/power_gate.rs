use log::info;

/// Inputs the driver enable line is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerDemand {
    pub motor_active: bool,
    pub turret_active: bool,
}

/// Enable line for the shared motor driver.
///
/// The level is recomputed from scratch every tick. The stored value is only
/// the last result, kept so transitions can be logged.
#[derive(Debug, Clone, Default)]
pub struct PowerGate {
    energized: bool,
}

impl PowerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(demand: PowerDemand) -> bool {
        demand.motor_active || demand.turret_active
    }

    pub fn recompute(&mut self, demand: PowerDemand) -> bool {
        let energized = Self::derive(demand);
        if energized != self.energized {
            info!(
                "motor driver {} (motor_active={}, turret_active={})",
                if energized { "energized" } else { "de-energized" },
                demand.motor_active,
                demand.turret_active
            );
        }
        self.energized = energized;
        energized
    }

    pub fn energized(&self) -> bool {
        self.energized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_demand_energizes() {
        let cases = [
            (false, false, false),
            (true, false, true),
            (false, true, true),
            (true, true, true),
        ];
        for (motor_active, turret_active, expected) in cases {
            let demand = PowerDemand {
                motor_active,
                turret_active,
            };
            assert_eq!(PowerGate::derive(demand), expected, "{:?}", demand);
        }
    }

    #[test]
    fn no_hysteresis() {
        let mut gate = PowerGate::new();
        assert!(gate.recompute(PowerDemand {
            motor_active: true,
            turret_active: false
        }));
        assert!(!gate.recompute(PowerDemand::default()));
        assert!(!gate.energized());
    }
}
