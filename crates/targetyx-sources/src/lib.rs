//! targetyx-sources: Annotation provider clients.
//!
//! Covers the request side of an annotation run:
//! - HTTP transport seam (`Transport`) with an allowlisted production impl
//! - 30-day response cache shared across process invocations
//! - GraphQL submission with retry, status validation and `data` extraction
//! - Open Targets, Pharos, EBI OLS, STRING-DB and UniProt clients

pub mod cache;
pub mod graphql;
pub mod ontology;
pub mod opentargets;
pub mod pharos;
pub mod session;
pub mod stringdb;
pub mod transport;
pub mod uniprot;

pub use cache::{CacheKey, MemoryCache, NoCache, ResponseCache, SqliteCache};
pub use ontology::OntologyClient;
pub use opentargets::OpenTargetsClient;
pub use pharos::PharosClient;
pub use session::CachedSession;
pub use stringdb::{NetworkFlavor, NetworkParams, NetworkType, StringDbClient, StringInteraction};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, MockTransport, RequestBody, RequestLog, SandboxTransport, Transport,
};
pub use uniprot::UniProtClient;
