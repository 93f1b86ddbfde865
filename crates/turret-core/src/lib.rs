pub mod command;
pub mod control_loop;
pub mod dispatch;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod power_gate;
pub mod ramp;
pub mod servo;
pub mod sync;
pub mod tags;
pub mod timebase;
pub mod turret;
pub mod vehicle;
pub mod watchdog;

pub use command::Command;
pub use control_loop::{ConfigError, ControlConfig, ExecutionStats, TickScheduler};
pub use dispatch::CommandDispatcher;
pub use hal::{ActuatorIO, OutputFrame, PinLevel};
#[cfg(feature = "simulation")]
pub use hal_sim::SimulatedActuators;
pub use power_gate::{PowerDemand, PowerGate};
pub use ramp::{Direction, DriveDuty, MotorState, RampController};
pub use servo::AngleActuator;
pub use sync::{CommandExchange, StagedToken, VehicleSnapshot};
pub use timebase::TimeBase;
pub use turret::{DiscreteActuator, TurretDirection};
pub use vehicle::VehicleState;
pub use watchdog::{CommandWatchdog, LinkState};
