// Domain models

mod change;
mod container;
mod event;

pub use change::ContainerChange;
pub use container::{ContainerState, ContainerStatus};
pub use event::{ContainerEvent, EventAction, Watermark};
