use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::catalog::CatalogStore;
use crate::recommender::Recommender;
use crate::similarity::SimilarityIndex;
use crate::store::{EngagementStore, UserStore};

/// Shared application state.
///
/// The catalog and similarity index are immutable after startup, so they are
/// shared without locks. The stores are trait objects so tests can swap the
/// PostgreSQL implementations for in-memory ones.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub recommender: Arc<Recommender>,
    pub signer: Arc<TokenSigner>,
    pub users: Arc<dyn UserStore>,
    pub engagement: Arc<dyn EngagementStore>,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogStore>,
        similarity: Arc<SimilarityIndex>,
        signer: TokenSigner,
        users: Arc<dyn UserStore>,
        engagement: Arc<dyn EngagementStore>,
    ) -> Self {
        let recommender = Arc::new(Recommender::new(catalog.clone(), similarity));
        Self {
            catalog,
            recommender,
            signer: Arc::new(signer),
            users,
            engagement,
        }
    }
}
