//! External service integrations.

pub mod places_client {
    pub use crate::places_client::*;
}

pub mod mercadopago_client {
    pub use crate::mercadopago_client::*;
}
