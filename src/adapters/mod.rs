//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - Conversation repository implementations (in-memory)
//! - `classifier` - Remote intent classifiers (OpenAI-compatible, mock)
//! - `directory` - Client directory implementations (in-memory, YAML seed)
//! - `clock` - System and manual clocks

pub mod classifier;
pub mod clock;
pub mod directory;
pub mod storage;

pub use classifier::{MockIntentClassifier, OpenAiClassifierConfig, OpenAiIntentClassifier};
pub use clock::{ManualClock, SystemClock};
pub use directory::InMemoryClientDirectory;
pub use storage::InMemoryConversationRepository;
