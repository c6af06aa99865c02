pub mod catalog;
pub mod clock;
pub mod comparator;
pub mod error;
pub mod keys;
pub mod locks;
pub mod mandate;
pub mod metrics;
pub mod mongo;
pub mod negotiation;
pub mod policy;
pub mod repository;
pub mod store;

pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use comparator::Criterion;
pub use error::{ErrorCode, NegotiationError, StorageError};
pub use keys::{KeyProvider, RsaKeyProvider};
pub use mandate::{MandateService, MandateSettings};
pub use metrics::{get_metrics, init_metrics};
pub use mongo::{MongoMandateRepository, MongoSessionRepository};
pub use negotiation::NegotiationService;
pub use policy::{FixedMarkup, MarkupSource, PolicyEngine, RandomMarkup, SupplierResponder};
pub use repository::{
    InMemoryMandateRepository, InMemorySessionRepository, MandateRepository, SessionRepository,
};
pub use store::SessionStore;
