// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod output_holder;
pub mod session;
pub mod trim_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use inspect_interactor::{InspectInteractor, InspectReport};
pub use output_holder::OutputHolder;
pub use session::Session;
pub use trim_interactor::TrimInteractor;
