//! The geo-ranking pipeline.
//!
//! [`RankingPipeline::run`] drives one *session*: token acquisition and
//! geolocation start together, the shop fetch follows the token, and every
//! input that arrives is posted as a [`PipelineUpdate`] tagged with the
//! session id. A [`RankingSession`] folds those updates and re-evaluates
//! after each one; it reports [`PipelineState::Loading`] until token,
//! coordinates and shops are all present.
//!
//! Starting a new session (a reload) supersedes the old one: updates that
//! still arrive for an old session id are discarded.

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::ShopApi;
use crate::config::{Config, RankingConfig};
use crate::error::FinderError;
use crate::location::{self, Geolocator};
use crate::models::{AuthToken, Coordinates, Marker, RankedShop, ShopRecord};
use crate::ranking::{build_markers, rank_shops};
use crate::retry::RetryPolicy;

/// One input arriving from an in-flight session.
#[derive(Debug)]
pub enum PipelineInput {
    Token(AuthToken),
    Coordinates(Coordinates),
    Shops(Vec<ShopRecord>),
    /// A failure the pipeline could not recover from.
    Failed(FinderError),
}

#[derive(Debug)]
pub struct PipelineUpdate {
    pub session: u64,
    pub input: PipelineInput,
}

/// Display-ready output of a finished session.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub user: Coordinates,
    pub shops: Vec<RankedShop>,
    /// Ranked shops followed by the user marker.
    pub markers: Vec<Marker>,
    /// Size of the full list the API returned.
    pub total_shops: usize,
    pub computed_at: DateTime<Local>,
}

#[derive(Debug)]
pub enum PipelineState {
    Loading,
    Ready(Ranking),
    Failed(FinderError),
}

impl PipelineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PipelineState::Loading)
    }
}

/// The three pipeline inputs of one session and the state derived from them.
#[derive(Debug)]
pub struct RankingSession {
    id: u64,
    config: RankingConfig,
    token: Option<AuthToken>,
    coordinates: Option<Coordinates>,
    shops: Option<Vec<ShopRecord>>,
    state: PipelineState,
}

impl RankingSession {
    pub fn new(id: u64, config: RankingConfig) -> Self {
        Self {
            id,
            config,
            token: None,
            coordinates: None,
            shops: None,
            state: PipelineState::Loading,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// How many of the three inputs (token, coordinates, shops) are in.
    pub fn inputs_received(&self) -> usize {
        usize::from(self.token.is_some())
            + usize::from(self.coordinates.is_some())
            + usize::from(self.shops.is_some())
    }

    /// Applies `update` and re-evaluates. Returns `false`, changing nothing,
    /// when the update belongs to another session.
    pub fn apply(&mut self, update: PipelineUpdate) -> bool {
        if update.session != self.id {
            warn!(
                stale = update.session,
                current = self.id,
                "Discarding result from superseded session."
            );
            return false;
        }
        if matches!(self.state, PipelineState::Failed(_)) {
            return true;
        }

        match update.input {
            PipelineInput::Token(token) => self.token = Some(token),
            PipelineInput::Coordinates(coords) => self.coordinates = Some(coords),
            PipelineInput::Shops(shops) => self.shops = Some(shops),
            PipelineInput::Failed(err) => {
                error!(session = self.id, error = %err, "Pipeline failed.");
                self.state = PipelineState::Failed(err);
                return true;
            }
        }
        self.evaluate();
        true
    }

    fn evaluate(&mut self) {
        let (Some(_), Some(user), Some(shops)) =
            (&self.token, self.coordinates, self.shops.as_mut())
        else {
            self.state = PipelineState::Loading;
            return;
        };

        let ranked = rank_shops(shops, user, &self.config);
        let markers = build_markers(&ranked, user);
        info!(
            session = self.id,
            total = shops.len(),
            shown = ranked.len(),
            "Ranking ready."
        );
        self.state = PipelineState::Ready(Ranking {
            user,
            total_shops: shops.len(),
            shops: ranked,
            markers,
            computed_at: Local::now(),
        });
    }
}

/// Token provider, shop fetcher and geolocator wired to one ranking config.
pub struct RankingPipeline {
    api: ShopApi,
    geolocator: Box<dyn Geolocator>,
    ranking: RankingConfig,
    retry: RetryPolicy,
}

impl RankingPipeline {
    pub fn new(
        api: ShopApi,
        geolocator: Box<dyn Geolocator>,
        ranking: RankingConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            geolocator,
            ranking,
            retry,
        }
    }

    /// # Errors
    ///
    /// Fails when the API client cannot be built from `config.api`.
    pub fn from_config(config: &Config) -> Result<Self, FinderError> {
        Ok(Self::new(
            ShopApi::new(&config.api)?,
            location::from_config(&config.location),
            config.ranking.clone(),
            RetryPolicy::from(&config.api),
        ))
    }

    pub fn ranking_config(&self) -> &RankingConfig {
        &self.ranking
    }

    /// Runs session `session`, posting every input to `tx` as it arrives.
    ///
    /// Token acquisition and geolocation run concurrently; the shop fetch
    /// waits for the token. Send failures (receiver gone) are ignored: the
    /// session simply has no audience any more.
    pub async fn run(&self, session: u64, tx: mpsc::UnboundedSender<PipelineUpdate>) {
        let post = |input: PipelineInput| {
            let _ = tx.send(PipelineUpdate { session, input });
        };

        let locate = async {
            match self.geolocator.locate().await {
                Ok(coords) => post(PipelineInput::Coordinates(coords)),
                Err(e) => post(PipelineInput::Failed(e)),
            }
        };
        let fetch = async {
            match self.fetch_with_retry(&post).await {
                Ok(shops) => post(PipelineInput::Shops(shops)),
                Err(e) => post(PipelineInput::Failed(e)),
            }
        };

        info!(session, "Starting pipeline session.");
        tokio::join!(locate, fetch);
    }

    /// Runs a whole session and returns where it ended up.
    pub async fn resolve(&self, session: u64) -> PipelineState {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = RankingSession::new(session, self.ranking.clone());
        self.run(session, tx).await;
        while let Some(update) = rx.recv().await {
            state.apply(update);
        }
        state.into_state()
    }

    /// Token → fetch, recovering from rejected tokens and server trouble
    /// within the limits of the retry policy. Every token in use is posted
    /// through `post`.
    async fn fetch_with_retry<F>(&self, post: &F) -> Result<Vec<ShopRecord>, FinderError>
    where
        F: Fn(PipelineInput) + Sync,
    {
        let mut token = self.api.acquire_token().await?;
        post(PipelineInput::Token(token.clone()));

        let mut attempts = 0u32;
        let mut refreshes = 0u32;
        let mut unavailable = 0u32;
        loop {
            attempts += 1;
            let err = match self.api.fetch_shops(&token).await {
                Ok(shops) => return Ok(shops),
                Err(err) => err,
            };

            if err.needs_new_token() {
                if refreshes >= self.retry.max_token_refreshes {
                    return Err(give_up(attempts, err));
                }
                refreshes += 1;
                if err.wants_backoff() {
                    tokio::time::sleep(self.retry.backoff_delay(refreshes)).await;
                }
                warn!(attempt = attempts, error = %err, "Re-acquiring token and retrying.");
                match self.api.acquire_token().await {
                    Ok(fresh) => {
                        token = fresh;
                        post(PipelineInput::Token(token.clone()));
                    }
                    Err(e) => warn!(error = %e, "Token refresh failed; keeping previous token."),
                }
            } else if matches!(err, FinderError::ServiceUnavailable) {
                if unavailable >= self.retry.max_unavailable_retries {
                    return Err(give_up(attempts, err));
                }
                unavailable += 1;
                let delay = self.retry.backoff_delay(unavailable);
                warn!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Shop service unavailable; backing off."
                );
                tokio::time::sleep(delay).await;
            } else {
                return Err(err);
            }
        }
    }
}

fn give_up(attempts: u32, last: FinderError) -> FinderError {
    if attempts <= 1 {
        last
    } else {
        FinderError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        }
    }
}
