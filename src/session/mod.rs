//! The interactive session: every round loads the schema, walks the tree with the user, records
//! the answer and saves the schema back if the round changed it.

pub mod change;
pub mod navigator;
pub mod recorder;
pub mod reminder;
pub mod shutdown;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use change::ChangeDetector;
use navigator::{NavigationError, TreeNavigator};
use recorder::{ActivityRecorder, Watermark};
use reminder::ReminderScheduler;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    conversation::{
        listener::{InputService, UserListener},
        messenger::Messenger,
        Conversation, InputError, InputLimits,
    },
    storage::{
        data_store::LocalDataStore, entities::RecordedActivity, schema_store::LocalSchemaStore,
        DataStore, SchemaStore, StoreError,
    },
    tree::{snapshot::Snapshot, CategoryTree},
    utils::{
        clock::Clock,
        dir::{DATA_FILE, SCHEMA_FILE},
    },
};

pub const DEFAULT_RESPONSE_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_DEFAULT_MINUTES: i64 = 60;
pub const DEFAULT_ROOT_OPTION: &str = "Work";
/// Reminders are at least once a year, or disabled.
pub const MAX_REMINDER_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub input: InputLimits,
    /// Longest time since the last record that a blank duration may stand for.
    pub max_default_elapsed: chrono::Duration,
    /// Option shown first at the root until the user enters some top level category.
    pub root_default: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input: InputLimits {
                response_wait: DEFAULT_RESPONSE_WAIT,
                max_retries: DEFAULT_MAX_RETRIES,
            },
            max_default_elapsed: chrono::Duration::minutes(DEFAULT_MAX_DEFAULT_MINUTES),
            root_default: DEFAULT_ROOT_OPTION.to_owned(),
        }
    }
}

/// Everything that survives between rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub watermark: Watermark,
    pub root_default: String,
}

#[derive(Debug)]
pub enum RoundOutcome {
    Recorded(RecordedActivity),
    /// The round failed and the user was told why.
    Failed,
    /// Nothing more can be read from the user.
    InputClosed,
    /// The session was shut down while waiting for the user.
    Cancelled,
}

#[derive(Debug)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    pub schema_saved: bool,
}

pub struct SessionLoop {
    conversation: Conversation,
    schema_store: Box<dyn SchemaStore>,
    data_store: Box<dyn DataStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: SessionState,
}

impl SessionLoop {
    pub fn new(
        conversation: Conversation,
        schema_store: Box<dyn SchemaStore>,
        data_store: Box<dyn DataStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
        watermark: Watermark,
    ) -> Self {
        let state = SessionState {
            watermark,
            root_default: config.root_default.clone(),
        };
        Self {
            conversation,
            schema_store,
            data_store,
            clock,
            config,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs rounds until `shutdown` is cancelled or input is closed. Only failures that make
    /// further rounds pointless are returned.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        while !shutdown.is_cancelled() {
            let report = self.round(&shutdown).await?;
            match report.outcome {
                RoundOutcome::InputClosed => {
                    info!("Input closed, ending session");
                    return Ok(());
                }
                RoundOutcome::Cancelled => return Ok(()),
                RoundOutcome::Recorded(_) | RoundOutcome::Failed => (),
            }
        }
        Ok(())
    }

    /// Runs a single round. Cancelling `shutdown` stops waiting for the user, but the tree as
    /// edited until then is still saved.
    pub async fn round(&mut self, shutdown: &CancellationToken) -> Result<RoundReport> {
        let snapshot = tokio::select! {
            _ = shutdown.cancelled() => {
                return Ok(RoundReport {
                    outcome: RoundOutcome::Cancelled,
                    schema_saved: false,
                })
            }
            snapshot = self.load_schema() => snapshot?,
        };
        let detector = ChangeDetector::new(snapshot.clone());
        let mut tree = CategoryTree::from_snapshot(&snapshot);

        let navigator = TreeNavigator::new(
            &mut tree,
            &mut self.conversation,
            &mut self.state.root_default,
            &self.state.watermark,
            self.clock.as_ref(),
            self.config.max_default_elapsed,
        );
        let navigation = tokio::select! {
            _ = shutdown.cancelled() => None,
            navigation = navigator.navigate() => Some(navigation),
        };

        let outcome = match navigation {
            None => {
                info!("Round cancelled");
                RoundOutcome::Cancelled
            }
            Some(Ok(selection)) => {
                let recorder = ActivityRecorder::new(self.data_store.as_ref(), self.clock.as_ref());
                match recorder
                    .record(&mut self.state.watermark, &selection.path, selection.minutes)
                    .await
                {
                    Ok(record) => {
                        self.conversation
                            .say(&format!(
                                "Recorded {} for {} minutes.",
                                record.activity, record.minutes
                            ))
                            .await?;
                        RoundOutcome::Recorded(record)
                    }
                    Err(e) => {
                        self.report(&format!("{e:#}")).await?;
                        RoundOutcome::Failed
                    }
                }
            }
            Some(Err(NavigationError::Input(InputError::Closed))) => RoundOutcome::InputClosed,
            Some(Err(e)) => {
                self.report(&e.to_string()).await?;
                RoundOutcome::Failed
            }
        };

        let schema_saved = self.save_if_changed(&detector, &tree).await?;
        Ok(RoundReport {
            outcome,
            schema_saved,
        })
    }

    /// Asks how often reminders should be sent, in minutes. Zero disables them.
    pub async fn ask_reminder_minutes(&mut self) -> Result<u64> {
        self.conversation
            .say(
                "How often, in minutes, would you like to be reminded to record activity? \
                 0 for never.",
            )
            .await?;
        let text = self
            .conversation
            .ask(|text| parse_reminder_minutes(text).map(|_| ()))
            .await?;
        parse_reminder_minutes(&text).map_err(anyhow::Error::msg)
    }

    async fn report(&self, message: &str) -> Result<()> {
        error!("Round failed: {message}");
        self.conversation
            .say(&format!("ERROR: {message}"))
            .await
            .context("Couldn't report error to user")
    }

    async fn load_schema(&mut self) -> Result<Snapshot> {
        let error = match self.schema_store.load().await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e @ StoreError::NotFound { .. }) => e,
            Err(e) => return Err(e).context("Couldn't load schema"),
        };

        warn!("{error}");
        self.conversation.say(&error.to_string()).await?;
        self.conversation
            .say("Would you like to create a new schema?")
            .await?;
        self.conversation
            .ask_with_retries(0, |text| {
                if text.eq_ignore_ascii_case("yes") {
                    Ok(())
                } else {
                    Err("well then you'll need to create it yourself".to_owned())
                }
            })
            .await
            .context("Schema wasn't created")?;

        let snapshot = self
            .schema_store
            .init()
            .await
            .context("Couldn't create default schema")?;
        info!("Created default schema");
        Ok(snapshot)
    }

    async fn save_if_changed(
        &self,
        detector: &ChangeDetector,
        tree: &CategoryTree,
    ) -> Result<bool> {
        let current = tree.to_snapshot();
        let Some(change) = detector.detect(&current) else {
            return Ok(false);
        };

        info!("Schema changed ({change}), saving");
        match self.schema_store.dump(&current, true).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.report(&format!("couldn't record schema change: {e}"))
                    .await?;
                Ok(false)
            }
        }
    }
}

fn parse_reminder_minutes(text: &str) -> Result<u64, String> {
    let minutes = text
        .parse::<u64>()
        .map_err(|_| "input must be a digit".to_owned())?;
    if minutes > MAX_REMINDER_MINUTES {
        return Err(format!(
            "reminders can't be further apart than {MAX_REMINDER_MINUTES} minutes"
        ));
    }
    Ok(minutes)
}

/// Paths and switches needed to wire a session up.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub dir: PathBuf,
    pub config: SessionConfig,
    pub remind_every: Option<u64>,
    pub reminder_command: Option<PathBuf>,
}

fn create_session(
    options: &SessionOptions,
    input: Box<dyn InputService>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    watermark: Watermark,
) -> SessionLoop {
    let listener = UserListener::new(input, messenger.clone());
    let conversation = Conversation::new(messenger, listener, options.config.input);
    SessionLoop::new(
        conversation,
        Box::new(LocalSchemaStore::new(options.dir.join(SCHEMA_FILE))),
        Box::new(LocalDataStore::new(options.dir.join(DATA_FILE))),
        clock,
        options.config.clone(),
        watermark,
    )
}

/// Starting point of the interactive session. Runs until Ctrl-C, end of input, or a failure the
/// session can't recover from.
pub async fn start_session(
    options: SessionOptions,
    input: Box<dyn InputService>,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let data_store = LocalDataStore::new(options.dir.join(DATA_FILE));
    let watermark = match data_store.last_recorded_at().await {
        Ok(Some(last)) => last,
        Ok(None) => clock.time(),
        Err(e) => {
            warn!("Couldn't read last record, counting from now {e:?}");
            clock.time()
        }
    };
    info!("Counting elapsed time from {watermark}");

    let mut session = create_session(
        &options,
        input,
        messenger.clone(),
        clock.clone(),
        Watermark::new(watermark),
    );

    let remind_every = match options.remind_every {
        Some(minutes) if minutes > MAX_REMINDER_MINUTES => {
            bail!(
                "Reminders can't be further apart than {MAX_REMINDER_MINUTES} minutes, \
                 got {minutes}"
            )
        }
        Some(minutes) => minutes,
        None => session.ask_reminder_minutes().await?,
    };

    let shutdown_token = CancellationToken::new();
    let reminder = ReminderScheduler::new(
        Duration::from_secs(remind_every * 60),
        messenger,
        clock,
        options.reminder_command.clone(),
        shutdown_token.clone(),
    );

    let (_, session_result, reminder_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = session.run(shutdown_token.clone()).await;
            shutdown_token.cancel();
            result
        },
        async {
            match reminder {
                Some(reminder) => reminder.run().await,
                None => Ok(()),
            }
        },
    );

    if let Err(reminder_result) = reminder_result {
        error!("Reminder task got an error {:?}", reminder_result);
    }

    session_result
}
