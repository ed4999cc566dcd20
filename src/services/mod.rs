pub mod capability;
pub mod discover;
pub mod fallback;
pub mod filters;
pub mod geolocation;
pub mod insights;
pub mod itinerary;
pub mod normalize;
pub mod places;
pub mod providers;
pub mod recommendations;

pub use capability::{CapabilityLoader, Readiness, RetryPolicy};
pub use discover::{run_search, DiscoverFlow, DiscoverState, SearchRequest, SearchResults};
pub use filters::FilterState;
pub use geolocation::{ConfiguredPosition, GeolocationProvider};
pub use itinerary::Itinerary;
pub use places::PlaceLookupClient;
pub use recommendations::RecommendationService;
