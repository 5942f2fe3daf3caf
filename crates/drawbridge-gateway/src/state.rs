//! Gateway shared state.

use crate::planner::Planner;
use crate::queue::CommandQueue;

/// Shared gateway state accessible from all handlers.
pub struct GatewayState {
    pub queue: CommandQueue,
    pub planner: Box<dyn Planner>,
}

impl GatewayState {
    pub fn new(planner: Box<dyn Planner>) -> Self {
        Self {
            queue: CommandQueue::new(),
            planner,
        }
    }
}
