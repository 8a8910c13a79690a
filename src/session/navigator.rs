//! Walks the category tree together with the user, one question at a time.
//!
//! The walk is an explicit state machine: options of the current node are presented, a selection
//! either descends, or adds a new option, and reaching a leaf asks for the number of minutes. Free
//! text given instead of minutes subdivides the leaf. Errors end the walk, but edits already made
//! to the tree are kept.

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    conversation::{messenger::MessengerError, Conversation, InputError},
    tree::{CategoryPath, CategoryTree, TreeError, PATH_SEPARATOR},
    utils::clock::Clock,
};

use super::recorder::{ElapsedDefault, Watermark};

const RECORD_DELIMITER: &str = ",";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Messenger(#[from] MessengerError),
    #[error(
        "time since last record is {elapsed} minutes, more than {ceiling} \
         minutes, please specify minutes"
    )]
    MinutesRequired { elapsed: i64, ceiling: i64 },
    #[error("cannot expand first option \"{option}\"")]
    CannotExpandFirstOption { option: String },
    #[error("option {index} is not in the list")]
    UnknownOption { index: i64 },
}

/// Leaf the user ended up at together with the minutes spent on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: CategoryPath,
    pub minutes: i64,
}

#[derive(Debug)]
enum NavigatorState {
    Presenting,
    AwaitingSelection { options: Vec<String> },
    /// `choice` is the index that led to the current leaf.
    AwaitingQuantity { choice: usize },
    Done(Selection),
}

pub struct TreeNavigator<'a> {
    tree: &'a mut CategoryTree,
    conversation: &'a mut Conversation,
    /// Option put first at the root. Updated whenever the user enters a top level category.
    sticky_root: &'a mut String,
    watermark: &'a Watermark,
    clock: &'a dyn Clock,
    max_default_elapsed: Duration,
    path: CategoryPath,
}

impl<'a> TreeNavigator<'a> {
    pub fn new(
        tree: &'a mut CategoryTree,
        conversation: &'a mut Conversation,
        sticky_root: &'a mut String,
        watermark: &'a Watermark,
        clock: &'a dyn Clock,
        max_default_elapsed: Duration,
    ) -> Self {
        Self {
            tree,
            conversation,
            sticky_root,
            watermark,
            clock,
            max_default_elapsed,
            path: CategoryPath::root(),
        }
    }

    pub async fn navigate(mut self) -> Result<Selection, NavigationError> {
        let mut state = NavigatorState::Presenting;
        loop {
            debug!("Navigator at {} in state {:?}", self.path, state);
            state = match state {
                NavigatorState::Presenting => self.present().await?,
                NavigatorState::AwaitingSelection { options } => self.select(options).await?,
                NavigatorState::AwaitingQuantity { choice } => self.quantity(choice).await?,
                NavigatorState::Done(selection) => return Ok(selection),
            };
        }
    }

    async fn present(&mut self) -> Result<NavigatorState, NavigationError> {
        let node = self.tree.get_subtree(&self.path)?;
        let default = self.path.last().unwrap_or(self.sticky_root.as_str());
        let options = ordered_options(node, default);

        let listing = if options.is_empty() {
            "There are no options here yet.".to_owned()
        } else {
            options
                .iter()
                .enumerate()
                .map(|(index, name)| format!("{index} .) {name}\n"))
                .collect::<String>()
        };
        self.conversation.say(&listing).await?;
        self.conversation
            .say("Choose an option from the list above, or type something new to add it.")
            .await?;

        Ok(NavigatorState::AwaitingSelection { options })
    }

    async fn select(&mut self, options: Vec<String>) -> Result<NavigatorState, NavigationError> {
        let count = options.len();
        let text = self
            .conversation
            .ask(move |text| validate_selection(text, count))
            .await?;

        let index = if text.is_empty() {
            Some(0)
        } else {
            parse_number(&text)
        };

        let Some(index) = index else {
            // Uniqueness is checked by the tree itself, a collision ends the walk untouched.
            self.tree.add_child(&self.path, &text)?;
            info!("Added option {text:?} under {}", self.path);
            return Ok(NavigatorState::Presenting);
        };

        let Some((choice, name)) = usize::try_from(index)
            .ok()
            .and_then(|choice| Some((choice, options.get(choice)?.clone())))
        else {
            return Err(NavigationError::UnknownOption { index });
        };
        if self.path.is_root() {
            *self.sticky_root = name.clone();
        }
        self.path.push(name);

        if self.tree.get_subtree(&self.path)?.is_leaf() {
            Ok(NavigatorState::AwaitingQuantity { choice })
        } else {
            Ok(NavigatorState::Presenting)
        }
    }

    async fn quantity(&mut self, choice: usize) -> Result<NavigatorState, NavigationError> {
        let name = self.path.last().unwrap_or_default().to_owned();
        self.conversation
            .say(&format!("{name} -- how many minutes did you do this for?"))
            .await?;
        let text = self.conversation.ask(validate_quantity).await?;

        if text.is_empty() {
            let elapsed = ElapsedDefault {
                watermark: self.watermark,
                clock: self.clock,
                ceiling: self.max_default_elapsed,
            };
            let minutes = elapsed
                .resolve()
                .map_err(|elapsed| NavigationError::MinutesRequired {
                    elapsed,
                    ceiling: self.max_default_elapsed.num_minutes(),
                })?;
            return Ok(self.done(minutes));
        }

        if let Some(minutes) = parse_number(&text) {
            return Ok(self.done(minutes));
        }

        if choice == 0 {
            return Err(NavigationError::CannotExpandFirstOption { option: name });
        }
        self.tree
            .add_child_with_sibling_promotion(&self.path, &text)?;
        info!("Subdivided {} with {text:?}", self.path);
        Ok(NavigatorState::Presenting)
    }

    fn done(&self, minutes: i64) -> NavigatorState {
        NavigatorState::Done(Selection {
            path: self.path.clone(),
            minutes,
        })
    }
}

/// Children of `node` in ascending order, with `default` swapped into the first position when it
/// is one of them.
pub fn ordered_options(node: &CategoryTree, default: &str) -> Vec<String> {
    let mut options = node.child_names().map(str::to_owned).collect::<Vec<_>>();
    if let Some(position) = options.iter().position(|name| name == default) {
        options.swap(0, position);
    }
    options
}

/// Every answer that reads as a number is treated as one, at both stages.
fn parse_number(text: &str) -> Option<i64> {
    text.parse::<i64>().ok()
}

fn validate_name(text: &str) -> Result<(), String> {
    if text.contains(PATH_SEPARATOR) || text.contains(RECORD_DELIMITER) {
        Err(format!(
            "option names can't contain '{PATH_SEPARATOR}' or '{RECORD_DELIMITER}'"
        ))
    } else {
        Ok(())
    }
}

fn validate_selection(text: &str, count: usize) -> Result<(), String> {
    if count == 0 && text.is_empty() {
        return Err("there is nothing to choose yet, type a name to add it".to_owned());
    }
    match parse_number(text) {
        Some(_) if count == 0 => {
            Err("there is nothing to choose yet, type a name to add it".to_owned())
        }
        Some(index) if index < 0 || index >= count as i64 => {
            Err(format!("input not in range [0, {}]", count - 1))
        }
        Some(_) => Ok(()),
        None => validate_name(text),
    }
}

fn validate_quantity(text: &str) -> Result<(), String> {
    match parse_number(text) {
        Some(minutes) if minutes < 0 => Err("minutes can't be negative".to_owned()),
        Some(_) => Ok(()),
        None => validate_name(text),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use crate::{
        conversation::{
            listener::{
                tests::{RecordingMessenger, ScriptedInput},
                UserListener,
            },
            Conversation, InputError, InputLimits,
        },
        session::recorder::Watermark,
        tree::{snapshot::Snapshot, CategoryPath, CategoryTree, TreeError},
        utils::clock::{Clock, ManualClock},
    };

    use super::{
        ordered_options, validate_quantity, validate_selection, NavigationError, Selection,
        TreeNavigator,
    };

    struct Harness {
        tree: CategoryTree,
        conversation: Conversation,
        messenger: Arc<RecordingMessenger>,
        sticky_root: String,
        watermark: Watermark,
        clock: ManualClock,
    }

    impl Harness {
        fn new(schema: &str, sticky_root: &str, inputs: &[&str]) -> Self {
            let snapshot: Snapshot = serde_json::from_str(schema).unwrap();
            let messenger = Arc::new(RecordingMessenger::default());
            let listener = UserListener::new(
                Box::new(ScriptedInput::new(inputs.iter().copied())),
                messenger.clone(),
            );
            let conversation = Conversation::new(
                messenger.clone(),
                listener,
                InputLimits {
                    response_wait: std::time::Duration::from_secs(60),
                    max_retries: 3,
                },
            );
            let clock = ManualClock::new(Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap());
            Self {
                tree: CategoryTree::from_snapshot(&snapshot),
                conversation,
                messenger,
                sticky_root: sticky_root.to_owned(),
                watermark: Watermark::new(clock.time() - Duration::minutes(10)),
                clock,
            }
        }

        fn since_last_record(mut self, minutes: i64) -> Self {
            self.watermark = Watermark::new(self.clock.time() - Duration::minutes(minutes));
            self
        }

        async fn navigate(&mut self) -> Result<Selection, NavigationError> {
            TreeNavigator::new(
                &mut self.tree,
                &mut self.conversation,
                &mut self.sticky_root,
                &self.watermark,
                &self.clock,
                Duration::minutes(60),
            )
            .navigate()
            .await
        }
    }

    const BOOKS: &str = r#"{"Books": {"Reading": null, "Fiction": null}, "Exercise": null}"#;

    fn path(segments: &[&str]) -> CategoryPath {
        segments.iter().copied().collect()
    }

    #[test]
    fn test_ordered_options_swaps_default_first() {
        let tree = CategoryTree::from_snapshot(
            &serde_json::from_str(r#"{"a": null, "b": null, "c": null, "d": null}"#).unwrap(),
        );
        assert_eq!(ordered_options(&tree, "c"), vec!["c", "b", "a", "d"]);
        assert_eq!(ordered_options(&tree, "a"), vec!["a", "b", "c", "d"]);
        assert_eq!(ordered_options(&tree, "missing"), vec!["a", "b", "c", "d"]);
        assert!(ordered_options(&CategoryTree::new(), "a").is_empty());
    }

    #[test]
    fn test_validators() {
        assert!(validate_selection("0", 2).is_ok());
        assert!(validate_selection("", 2).is_ok());
        assert!(validate_selection("Cooking", 2).is_ok());
        assert_eq!(
            validate_selection("2", 2),
            Err("input not in range [0, 1]".to_owned())
        );
        assert!(validate_selection("-1", 2).is_err());
        assert!(validate_selection("", 0).is_err());
        assert!(validate_selection("0", 0).is_err());
        assert!(validate_selection("Books.Fiction", 2).is_err());
        assert!(validate_selection("a,b", 2).is_err());
        assert!(validate_selection("-0", 2).is_ok());
        assert!(validate_selection("+1", 2).is_ok());

        assert!(validate_quantity("").is_ok());
        assert!(validate_quantity("25").is_ok());
        assert!(validate_quantity("Running").is_ok());
        assert!(validate_quantity("-5").is_err());
    }

    #[tokio::test]
    async fn test_walks_to_existing_leaf() {
        // "Exercise" is the sticky root option, so the root reads [Exercise, Books].
        let mut harness = Harness::new(BOOKS, "Exercise", &["1", "1", "25"]);
        let before = harness.tree.clone();

        let selection = harness.navigate().await.unwrap();

        assert_eq!(
            selection,
            Selection {
                path: path(&["Books", "Reading"]),
                minutes: 25
            }
        );
        assert_eq!(harness.tree, before);
        let messages = harness.messenger.messages();
        assert_eq!(messages[0], "0 .) Exercise\n1 .) Books\n");
        assert_eq!(messages[2], "0 .) Fiction\n1 .) Reading\n");
        assert_eq!(messages[4], "Reading -- how many minutes did you do this for?");
    }

    #[tokio::test]
    async fn test_entering_top_level_category_makes_it_sticky() {
        let mut harness = Harness::new(BOOKS, "Work", &["1", "5"]);

        let selection = harness.navigate().await.unwrap();

        assert_eq!(selection.path, path(&["Exercise"]));
        assert_eq!(harness.sticky_root, "Exercise");
        let root = harness.tree.get_subtree(&CategoryPath::root()).unwrap();
        assert_eq!(ordered_options(root, &harness.sticky_root), vec!["Exercise", "Books"]);
    }

    #[tokio::test]
    async fn test_blank_selection_picks_first_option() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["", "30"]);
        let selection = harness.navigate().await.unwrap();
        assert_eq!(selection.path, path(&["Exercise"]));
        assert_eq!(selection.minutes, 30);
    }

    #[tokio::test]
    async fn test_signed_zero_selects_first_option() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["-0", "5"]);
        let before = harness.tree.clone();

        let selection = harness.navigate().await.unwrap();

        assert_eq!(
            selection,
            Selection {
                path: path(&["Exercise"]),
                minutes: 5
            }
        );
        assert_eq!(harness.tree, before);
    }

    #[tokio::test]
    async fn test_new_option_is_listed_but_not_selected() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["Cooking", "1", "30"]);

        let selection = harness.navigate().await.unwrap();

        assert_eq!(selection.path, path(&["Cooking"]));
        assert!(harness.tree.contains_child("Cooking"));
        let messages = harness.messenger.messages();
        assert_eq!(messages[2], "0 .) Exercise\n1 .) Cooking\n2 .) Books\n");
    }

    #[tokio::test]
    async fn test_duplicate_option_is_rejected_without_changes() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["Books"]);
        let before = harness.tree.clone();

        let result = harness.navigate().await;

        assert!(matches!(
            result,
            Err(NavigationError::Tree(TreeError::Collision { ref name, .. })) if name == "Books"
        ));
        assert_eq!(harness.tree, before);
    }

    #[tokio::test]
    async fn test_text_instead_of_minutes_subdivides_leaf() {
        let mut harness = Harness::new(BOOKS, "Work", &["1", "Running", "1", ""]);

        let selection = harness.navigate().await.unwrap();

        assert_eq!(
            selection,
            Selection {
                path: path(&["Exercise", "Running"]),
                minutes: 10
            }
        );
        let exercise = harness.tree.get_subtree(&path(&["Exercise"])).unwrap();
        assert_eq!(
            exercise.child_names().collect::<Vec<_>>(),
            vec!["Exercise", "Running"]
        );
        let messages = harness.messenger.messages();
        assert!(messages.contains(&"0 .) Exercise\n1 .) Running\n".to_owned()));
    }

    #[tokio::test]
    async fn test_first_option_cannot_be_subdivided() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["0", "Running"]);
        let before = harness.tree.clone();

        let result = harness.navigate().await;

        assert!(matches!(
            result,
            Err(NavigationError::CannotExpandFirstOption { ref option }) if option == "Exercise"
        ));
        assert_eq!(harness.tree, before);
    }

    #[tokio::test]
    async fn test_blank_minutes_over_ceiling_fail() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["0", ""]).since_last_record(61);
        let result = harness.navigate().await;
        assert!(matches!(
            result,
            Err(NavigationError::MinutesRequired {
                elapsed: 61,
                ceiling: 60
            })
        ));
    }

    #[tokio::test]
    async fn test_blank_minutes_under_ceiling_use_elapsed() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["0", ""]).since_last_record(59);
        let selection = harness.navigate().await.unwrap();
        assert_eq!(selection.minutes, 59);
    }

    #[tokio::test]
    async fn test_out_of_range_selection_is_retried() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["7", "0", "15"]);

        let selection = harness.navigate().await.unwrap();

        assert_eq!(selection.path, path(&["Exercise"]));
        assert!(harness
            .messenger
            .messages()
            .contains(&"Invalid input: input not in range [0, 1]".to_owned()));
    }

    #[tokio::test]
    async fn test_exhausted_input_fails_but_keeps_additions() {
        let mut harness = Harness::new(BOOKS, "Exercise", &["Cooking", "9", "9", "9", "9"]);

        let result = harness.navigate().await;

        assert!(matches!(
            result,
            Err(NavigationError::Input(InputError::Exhausted { attempts: 4, .. }))
        ));
        assert!(harness.tree.contains_child("Cooking"));
    }

    #[tokio::test]
    async fn test_empty_tree_grows_from_scratch() {
        let mut harness = Harness::new("{}", "Work", &["0", "Work", "0", "45"]);

        let selection = harness.navigate().await.unwrap();

        assert_eq!(
            selection,
            Selection {
                path: path(&["Work"]),
                minutes: 45
            }
        );
        assert_eq!(harness.messenger.messages()[0], "There are no options here yet.");
    }
}
