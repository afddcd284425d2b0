pub mod completion_llm;
pub mod http;
pub mod identity_firebase;
pub mod identity_local;
pub mod memory_store;
pub mod speech;
pub mod tutor_stub;

pub use completion_llm::OmniDimCompletionAdapter;
pub use identity_firebase::FirebaseIdentityAdapter;
pub use identity_local::LocalIdentityAdapter;
pub use memory_store::MemoryStore;
pub use speech::OmniDimSpeechAdapter;
pub use tutor_stub::StubTutorAdapter;
