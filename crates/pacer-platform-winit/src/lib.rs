mod app;
mod events;
mod presenter;

pub use app::run_winit_app;
pub use events::UserEvent;
pub use presenter::WinitPresenter;
