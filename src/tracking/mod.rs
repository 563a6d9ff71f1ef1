//! Activity tracking: session lifecycle and metric derivation.

pub mod clock;
pub mod distance;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use distance::{derive_steps, haversine_distance, DistanceTracker};
pub use providers::{
    ActivityStore, CalibrationSource, LocationError, LocationProvider, NoLocation, StoreError,
};
pub use runtime::{AppLifecycle, SessionCommand, SessionEvent, SessionRuntime};
pub use session::SessionController;
pub use types::{
    Activity, ActivityKind, ActivityUpdate, ForegroundResume, LocationFix, PauseReason,
    RoutePoint, SessionError, SessionExtension, SessionSnapshot, SessionStatus, TrackerConfig,
};
