// Domain-layer modules and shared errors/models
pub mod scoring {
    pub use crate::scoring::*;
}

pub mod cache {
    pub use crate::cache::*;
}

pub mod prospecting {
    pub use crate::prospecting::*;
}

pub mod subscriptions {
    pub use crate::subscriptions::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
