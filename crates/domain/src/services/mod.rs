//! Domain services for CampusCare.
//!
//! Services contain business logic that operates on domain models.

pub mod broadcast;
pub mod intake;
pub mod lifecycle;
pub mod live_query;
pub mod memory;
pub mod messaging;
pub mod push;
pub mod sequence;
pub mod session;
pub mod store;
pub mod views;

pub use broadcast::{BroadcastDispatcher, BroadcastError, BroadcastReceipt, BroadcastRequest};
pub use intake::{IntakeError, IntakeService};
pub use lifecycle::{InFlightGuard, LifecycleError, StatusLifecycle, TransitionOutcome};
pub use live_query::{LiveQueries, Snapshot, SnapshotError, Subscription};
pub use memory::InMemoryStore;
pub use messaging::{
    MessagingError, MessagingService, MulticastReceipt, NotificationFanOut, RegistrationReceipt,
    SendNotificationRequest, SendReceipt, SendTargetedRequest, SubscribeRequest,
};
pub use push::{MockPushGateway, MulticastReport, PushError, PushGateway, PushMessage, PushTarget};
pub use session::{
    MemorySessionStorage, SessionContext, SessionError, SessionGuard, SessionStorage,
};
pub use store::{
    AlertStore, ChangeFeed, Collection, DocumentStore, IncidentStore, NotificationStore,
    PushRegistrationStore, SosStore, StoreError, UserStore, WindowQuery,
};
pub use views::{AdminLiveViews, DashboardLoader, IncidentFilter, ViewLimits};
