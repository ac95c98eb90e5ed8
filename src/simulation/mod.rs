pub mod clock;
pub mod command;
pub mod context;
pub(crate) mod dispatch;
pub mod scheduler;
pub mod tick;

pub use clock::Clock;
pub use command::{Command, Progression};
pub use context::SimulationContext;
pub use scheduler::{ScheduleHandle, ScheduledAction, Scheduler};
pub use tick::{run_simulation_tick, TickReport};
