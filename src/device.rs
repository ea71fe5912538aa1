//! Prompt-driven state machine for CLI devices.
//!
//! A [`DeviceHandler`] classifies every line the device prints into a state:
//! plain output, a pager prompt, an error line, one of the CLI prompts
//! (`login`, `enable`, `config`, ...) or a prompt that expects input
//! (`Username:`, `Password:`). Sessions feed it lines and ask it two things:
//! "is this a prompt yet?" and "does the device want something typed?".
//! It also knows which commands move between CLI modes and finds the
//! shortest way from the current mode to a target one.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

const OUTPUT_STATE: usize = 0;
const MORE_STATE: usize = 1;
const ERROR_STATE: usize = 2;

/// States that exist in every handler, in index order.
static PRE_STATE: &[&str] = &["output", "more", "error"];

/// A CLI prompt and the patterns that recognize it.
#[derive(Debug, Clone)]
pub struct PromptState {
    pub state: String,
    pub patterns: Vec<String>,
}

impl PromptState {
    pub fn new(state: &str, patterns: &[&str]) -> Self {
        Self {
            state: state.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// What to type when an input prompt shows up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResponse {
    /// Always send this literal text.
    Static(String),
    /// Send the handler parameter with this key (credentials, secrets).
    Param(String),
}

/// A prompt that expects the client to type something.
#[derive(Debug, Clone)]
pub struct InputState {
    pub state: String,
    pub response: InputResponse,
    /// Keep the prompt line in the command output.
    pub record: bool,
    pub patterns: Vec<String>,
}

impl InputState {
    pub fn param(state: &str, key: &str, patterns: &[&str]) -> Self {
        Self {
            state: state.to_string(),
            response: InputResponse::Param(key.to_string()),
            record: true,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A command that moves the CLI from one mode to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub command: String,
    pub to: String,
    /// Leaves a mode rather than entering one.
    pub is_exit: bool,
}

impl Transition {
    pub fn enter(from: &str, command: &str, to: &str) -> Self {
        Self {
            from: from.to_ascii_lowercase(),
            command: command.to_string(),
            to: to.to_ascii_lowercase(),
            is_exit: false,
        }
    }

    pub fn exit(from: &str, command: &str, to: &str) -> Self {
        Self {
            is_exit: true,
            ..Self::enter(from, command, to)
        }
    }
}

/// Everything needed to build a [`DeviceHandler`].
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    /// Checked in order; the first prompt that matches wins.
    pub prompts: Vec<PromptState>,
    pub inputs: Vec<InputState>,
    pub more_patterns: Vec<String>,
    pub error_patterns: Vec<String>,
    /// Error lines that should be treated as ordinary output.
    pub ignore_errors: Vec<String>,
    pub transitions: Vec<Transition>,
    pub params: HashMap<String, String>,
}

pub struct DeviceHandler {
    /// Index of the current state in `all_states`
    current_state_index: usize,

    /// All possible states the device can be in
    all_states: Vec<String>,

    /// Combined regex set for matching all state patterns
    all_regex: RegexSet,

    /// Maps regex match index to state index
    regex_state: Vec<usize>,

    /// Index range for prompt states in `all_states` (start, end)
    prompt_index: (usize, usize),

    /// Response to send per input state, and whether the prompt is kept in output
    input_map: HashMap<String, (InputResponse, bool)>,

    transitions: Vec<Transition>,

    /// Regex patterns for errors that should be ignored
    ignore_errors: Option<RegexSet>,

    /// Values for [`InputResponse::Param`] inputs
    params: HashMap<String, String>,

    /// Last prompt text matched by the state machine.
    current_prompt: Option<String>,

    /// Prompt regex patterns grouped by state (for diagnostics).
    prompt_patterns: Vec<(String, String)>,
}

/// Diagnostics summary for a device state machine graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateMachineDiagnostics {
    /// Number of declared states.
    pub total_states: usize,
    /// States participating in transition graph edges.
    pub graph_states: Vec<String>,
    /// Edge sources that do not exist in declared states.
    pub missing_edge_sources: Vec<String>,
    /// Edge targets that do not exist in declared states.
    pub missing_edge_targets: Vec<String>,
    /// Graph states unreachable from entry states.
    pub unreachable_states: Vec<String>,
    /// Graph states with no outgoing edges.
    pub dead_end_states: Vec<String>,
    /// Prompt regex patterns shared by multiple states.
    pub duplicate_prompt_patterns: Vec<String>,
    /// States whose outgoing transitions are only self-loop edges.
    pub self_loop_only_states: Vec<String>,
}

impl StateMachineDiagnostics {
    /// Returns true if diagnostics indicate potential template issues.
    pub fn has_issues(&self) -> bool {
        !self.missing_edge_sources.is_empty()
            || !self.missing_edge_targets.is_empty()
            || !self.unreachable_states.is_empty()
            || !self.dead_end_states.is_empty()
            || !self.duplicate_prompt_patterns.is_empty()
            || !self.self_loop_only_states.is_empty()
    }
}

/// Anchors a prompt pattern at line start, tolerating NUL padding and a
/// stray carriage return some terminals emit before redrawing the prompt.
fn anchor_prompt(pattern: &str) -> String {
    format!(r"^\x00*\r{{0,1}}{}", pattern.trim_start_matches('^'))
}

impl DeviceHandler {
    /// Builds a handler, compiling every pattern into one regex set.
    pub fn new(config: HandlerConfig) -> Result<DeviceHandler, ConnectError> {
        let mut all_states: Vec<String> = PRE_STATE.iter().map(|s| s.to_string()).collect();
        let mut regexs: Vec<String> = Vec::new();
        let mut regex_state: Vec<usize> = Vec::new();

        for pattern in config.more_patterns {
            regexs.push(pattern);
            regex_state.push(MORE_STATE);
        }
        for pattern in config.error_patterns {
            regexs.push(pattern);
            regex_state.push(ERROR_STATE);
        }

        let mut prompt_patterns = Vec::new();
        let prompt_start = all_states.len();
        for prompt in config.prompts {
            let state = prompt.state.to_ascii_lowercase();
            let state_index = all_states.len();
            all_states.push(state.clone());
            for pattern in prompt.patterns {
                let anchored = anchor_prompt(&pattern);
                prompt_patterns.push((state.clone(), anchored.clone()));
                regexs.push(anchored);
                regex_state.push(state_index);
            }
        }
        let prompt_index = (prompt_start, all_states.len().saturating_sub(1));

        let mut input_map = HashMap::new();
        for input in config.inputs {
            let state = input.state.to_ascii_lowercase();
            let state_index = all_states.len();
            all_states.push(state.clone());
            for pattern in input.patterns {
                regexs.push(pattern);
                regex_state.push(state_index);
            }
            input_map.insert(state, (input.response, input.record));
        }
        input_map.insert(
            PRE_STATE[MORE_STATE].to_string(),
            (InputResponse::Static(" ".to_string()), false),
        );

        let all_regex = RegexSet::new(&regexs).map_err(|err| {
            ConnectError::InvalidDeviceHandlerConfig(format!(
                "failed to build state regex set: {err}"
            ))
        })?;

        let ignore_errors = if config.ignore_errors.is_empty() {
            None
        } else {
            Some(RegexSet::new(&config.ignore_errors).map_err(|err| {
                ConnectError::InvalidDeviceHandlerConfig(format!(
                    "invalid ignore_errors regex set: {err}"
                ))
            })?)
        };

        let transitions = config
            .transitions
            .into_iter()
            .map(|t| Transition {
                from: t.from.to_ascii_lowercase(),
                to: t.to.to_ascii_lowercase(),
                ..t
            })
            .collect();

        Ok(Self {
            current_state_index: OUTPUT_STATE,
            all_states,
            all_regex,
            regex_state,
            prompt_index,
            input_map,
            transitions,
            ignore_errors,
            params: config.params,
            current_prompt: None,
            prompt_patterns,
        })
    }

    /// Maps a line to the state of the first matching pattern, or `output`.
    fn line2state(&self, line: &str) -> usize {
        self.all_regex
            .matches(line)
            .into_iter()
            .next()
            .and_then(|index| self.regex_state.get(index).copied())
            .unwrap_or(OUTPUT_STATE)
    }

    fn state_name(&self, index: usize) -> &str {
        self.all_states
            .get(index)
            .map(|s| s.as_str())
            .unwrap_or(PRE_STATE[OUTPUT_STATE])
    }

    fn is_prompt_index(&self, index: usize) -> bool {
        let (start, end) = self.prompt_index;
        index >= start && index <= end && start <= end
    }

    fn ignore_error(&self, line: &str) -> bool {
        self.ignore_errors
            .as_ref()
            .map(|set| set.is_match(line))
            .unwrap_or(false)
    }

    /// Reads one line of device output and moves to the state it implies.
    pub fn read(&mut self, line: &str) {
        trace!("Read line: '{:?}'", line);
        let state_index = self.line2state(line);
        trace!("Converted to state: '{}'", self.state_name(state_index));
        if state_index == ERROR_STATE && self.ignore_error(line) {
            trace!("Ignoring error state");
            self.current_state_index = OUTPUT_STATE;
            return;
        }
        if self.is_prompt_index(state_index) {
            self.current_prompt = Some(line.to_string());
        }
        self.current_state_index = state_index;
    }

    /// Whether a (possibly partial) line is a CLI prompt.
    ///
    /// Prompts usually arrive without a trailing newline, so sessions call
    /// this on whatever is left in the buffer after splitting lines.
    pub fn read_prompt(&self, line: &str) -> bool {
        self.is_prompt_index(self.line2state(line))
    }

    /// Returns the text to type if `line` is an input prompt.
    ///
    /// The second element says whether the prompt line belongs in the
    /// command output. Parameter-backed inputs whose parameter is unset
    /// return `None`.
    pub fn read_need_write(&self, line: &str) -> Option<(String, bool)> {
        let state = self.state_name(self.line2state(line));
        let (response, record) = self.input_map.get(state)?;
        match response {
            InputResponse::Static(text) => Some((text.clone(), *record)),
            InputResponse::Param(key) => self.params.get(key).map(|v| (v.clone(), *record)),
        }
    }

    /// Sets the value typed for [`InputResponse::Param`] inputs with `key`.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(key.to_string(), value.into());
    }

    pub fn current_state(&self) -> &str {
        self.state_name(self.current_state_index)
    }

    /// Returns last prompt text matched by the state machine.
    pub fn current_prompt(&self) -> Option<&str> {
        self.current_prompt.as_deref()
    }

    /// Whether the last line read was an error line.
    pub fn error(&self) -> bool {
        self.current_state_index == ERROR_STATE
    }

    /// Returns all declared state names.
    pub fn states(&self) -> &[String] {
        &self.all_states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Calculates the commands needed to reach `target` from the current state.
    ///
    /// Breadth-first search over the transition graph, so the path is the
    /// shortest one. Returns `(command, state_after_command)` pairs; an empty
    /// vector when already there.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::UnreachableState` if there's no path to the target state.
    pub fn transition_path(&self, target: &str) -> Result<Vec<(String, String)>, ConnectError> {
        let start = self.current_state().to_string();
        let target = target.to_ascii_lowercase();
        if start == target {
            return Ok(Vec::new());
        }

        let mut adj_list: HashMap<&str, Vec<&Transition>> = HashMap::new();
        for t in &self.transitions {
            adj_list.entry(t.from.as_str()).or_default().push(t);
        }

        let mut queue = VecDeque::new();
        queue.push_back(start.as_str());
        let mut visited = HashSet::new();
        visited.insert(start.as_str());
        // child -> (parent, command leading to child)
        let mut predecessors: HashMap<&str, (&str, &str)> = HashMap::new();

        while let Some(node) = queue.pop_front() {
            if node == target {
                break;
            }
            for t in adj_list.get(node).into_iter().flatten() {
                if visited.insert(t.to.as_str()) {
                    predecessors.insert(t.to.as_str(), (node, t.command.as_str()));
                    queue.push_back(t.to.as_str());
                }
            }
        }

        if !predecessors.contains_key(target.as_str()) {
            return Err(ConnectError::UnreachableState(target));
        }

        let mut path = Vec::new();
        let mut current = target.as_str();
        while current != start {
            let Some((parent, command)) = predecessors.get(current) else {
                return Err(ConnectError::InternalServerError(format!(
                    "failed to backtrack path from '{target}' to '{start}'"
                )));
            };
            path.push((command.to_string(), current.to_string()));
            current = parent;
        }
        path.reverse();
        trace!("Command path: '{:?}'", path);
        Ok(path)
    }

    /// Analyzes the transition graph for common template mistakes.
    pub fn diagnose(&self) -> StateMachineDiagnostics {
        let declared: HashSet<&str> = self.all_states.iter().map(|s| s.as_str()).collect();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut graph_states: HashSet<&str> = HashSet::new();
        let mut missing_edge_sources = HashSet::new();
        let mut missing_edge_targets = HashSet::new();

        for t in &self.transitions {
            if !declared.contains(t.from.as_str()) {
                missing_edge_sources.insert(t.from.clone());
                continue;
            }
            if !declared.contains(t.to.as_str()) {
                missing_edge_targets.insert(t.to.clone());
                continue;
            }
            graph_states.insert(&t.from);
            graph_states.insert(&t.to);
            adjacency.entry(&t.from).or_default().push(&t.to);
            *in_degree.entry(&t.to).or_insert(0) += 1;
        }

        let mut graph_states = graph_states.into_iter().collect::<Vec<_>>();
        graph_states.sort();

        // A fully cyclic graph has no entry state; seed from the first one.
        let mut seeds = graph_states
            .iter()
            .copied()
            .filter(|s| in_degree.get(s).copied().unwrap_or(0) == 0)
            .collect::<Vec<_>>();
        if seeds.is_empty() {
            seeds.extend(graph_states.first().copied());
        }
        let mut reachable: HashSet<&str> = seeds.iter().copied().collect();
        let mut queue: VecDeque<&str> = seeds.into_iter().collect();
        while let Some(node) = queue.pop_front() {
            for next in adjacency.get(node).into_iter().flatten() {
                if reachable.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let collect = |pred: &dyn Fn(&str) -> bool| {
            graph_states
                .iter()
                .filter(|s| pred(s))
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        };
        let unreachable_states = collect(&|s| !reachable.contains(s));
        let dead_end_states = collect(&|s| !adjacency.contains_key(s));
        let self_loop_only_states = collect(&|s| {
            adjacency
                .get(s)
                .map(|targets| targets.iter().all(|t| *t == s))
                .unwrap_or(false)
        });

        let mut pattern_states: HashMap<&str, Vec<&str>> = HashMap::new();
        for (state, pattern) in &self.prompt_patterns {
            let states = pattern_states.entry(pattern).or_default();
            if !states.contains(&state.as_str()) {
                states.push(state);
            }
        }
        let mut duplicate_prompt_patterns = pattern_states
            .into_iter()
            .filter(|(_, states)| states.len() > 1)
            .map(|(pattern, mut states)| {
                states.sort();
                format!("{pattern} => {}", states.join(","))
            })
            .collect::<Vec<_>>();
        duplicate_prompt_patterns.sort();

        let mut missing_edge_sources = missing_edge_sources.into_iter().collect::<Vec<_>>();
        missing_edge_sources.sort();
        let mut missing_edge_targets = missing_edge_targets.into_iter().collect::<Vec<_>>();
        missing_edge_targets.sort();

        StateMachineDiagnostics {
            total_states: self.all_states.len(),
            graph_states: graph_states.iter().map(|s| s.to_string()).collect(),
            missing_edge_sources,
            missing_edge_targets,
            unreachable_states,
            dead_end_states,
            duplicate_prompt_patterns,
            self_loop_only_states,
        }
    }
}

/// Regex pattern for matching and removing control characters at the start of lines.
///
/// Matches the carriage returns and backspaces a terminal emits when it
/// redraws a line, which would otherwise hide prompts and error markers.
pub static IGNORE_START_LINE: Lazy<Regex> =
    Lazy::new(
        || match Regex::new(r"^(\r+(\s+\r+)*)|(\u{8}+(\s+\u{8}+)*)") {
            Ok(re) => re,
            Err(err) => panic!("invalid IGNORE_START_LINE regex: {err}"),
        },
    );

#[cfg(test)]
mod tests {
    use super::{DeviceHandler, HandlerConfig, InputResponse, InputState, PromptState, Transition};
    use crate::error::ConnectError;

    fn build_test_handler() -> DeviceHandler {
        let mut config = HandlerConfig {
            prompts: vec![
                PromptState::new("Config", &[r"^dev\(cfg\)#\s*$"]),
                PromptState::new("Enable", &[r"^dev#\s*$"]),
                PromptState::new("Login", &[r"^dev>\s*$"]),
            ],
            inputs: vec![
                InputState::param("Password", "Password", &[r"^Password:\s*$"]),
                InputState {
                    state: "Confirm".to_string(),
                    response: InputResponse::Static("y".to_string()),
                    record: false,
                    patterns: vec![r"^\[y\/n\]\?\s*$".to_string()],
                },
            ],
            more_patterns: vec![r"^--More--$".to_string()],
            error_patterns: vec![r"^ERROR: .+$".to_string()],
            ignore_errors: vec![r"^ERROR: benign$".to_string()],
            transitions: vec![
                Transition::enter("Login", "enable", "Enable"),
                Transition::enter("Enable", "configure terminal", "Config"),
                Transition::exit("Config", "end", "Enable"),
                Transition::exit("Enable", "disable", "Login"),
            ],
            ..Default::default()
        };
        config
            .params
            .insert("Password".to_string(), "secret\n".to_string());
        DeviceHandler::new(config).expect("test handler config should be valid")
    }

    #[test]
    fn error_state_is_detected_after_error_line() {
        let mut handler = build_test_handler();

        assert!(!handler.error());
        handler.read("ERROR: invalid command");
        assert!(handler.error());
    }

    #[test]
    fn ignore_error_pattern_resets_to_output_state() {
        let mut handler = build_test_handler();

        handler.read("ERROR: benign");
        assert_eq!(handler.current_state(), "output");
        assert!(!handler.error());
    }

    #[test]
    fn current_prompt_is_updated_when_prompt_line_is_read() {
        let mut handler = build_test_handler();
        assert_eq!(handler.current_prompt(), None);

        handler.read("dev#");
        assert_eq!(handler.current_prompt(), Some("dev#"));
        assert_eq!(handler.current_state(), "enable");

        handler.read("some output");
        assert_eq!(handler.current_prompt(), Some("dev#"));
        assert_eq!(handler.current_state(), "output");
    }

    #[test]
    fn first_declared_prompt_wins_on_overlap() {
        let mut handler = build_test_handler();
        handler.read("dev(cfg)#");
        assert_eq!(handler.current_state(), "config");
    }

    #[test]
    fn prompt_with_leading_nul_and_carriage_return_is_recognized() {
        let handler = build_test_handler();
        assert!(handler.read_prompt("\u{0}\rdev>"));
        assert!(!handler.read_prompt("dev> show"));
    }

    #[test]
    fn read_need_write_supports_param_and_static_inputs() {
        let mut handler = build_test_handler();

        assert_eq!(
            handler.read_need_write("Password:"),
            Some(("secret\n".to_string(), true))
        );
        assert_eq!(
            handler.read_need_write("[y/n]?"),
            Some(("y".to_string(), false))
        );
        assert_eq!(
            handler.read_need_write("--More--"),
            Some((" ".to_string(), false))
        );
        assert_eq!(handler.read_need_write("no input"), None);

        handler.set_param("Password", "other\n");
        assert_eq!(
            handler.read_need_write("Password:"),
            Some(("other\n".to_string(), true))
        );
    }

    #[test]
    fn unset_param_input_returns_none() {
        let handler = DeviceHandler::new(HandlerConfig {
            prompts: vec![PromptState::new("Login", &[r"^dev>\s*$"])],
            inputs: vec![InputState::param("Username", "Username", &[r"^Username:\s*$"])],
            ..Default::default()
        })
        .expect("handler should build");

        assert_eq!(handler.read_need_write("Username:"), None);
    }

    #[test]
    fn transition_path_is_found_for_reachable_state() {
        let mut handler = build_test_handler();
        handler.read("dev>");

        let path = handler
            .transition_path("Config")
            .expect("reachable path should be found");

        assert_eq!(
            path,
            vec![
                ("enable".to_string(), "enable".to_string()),
                ("configure terminal".to_string(), "config".to_string()),
            ]
        );
    }

    #[test]
    fn transition_path_is_empty_when_already_in_target() {
        let mut handler = build_test_handler();
        handler.read("dev#");

        assert!(handler.transition_path("enable").unwrap().is_empty());
    }

    #[test]
    fn transition_to_unknown_state_returns_error() {
        let mut handler = build_test_handler();
        handler.read("dev>");

        let err = handler
            .transition_path("does-not-exist")
            .expect_err("unknown target state should return error");
        match err {
            ConnectError::UnreachableState(s) => assert_eq!(s, "does-not-exist"),
            other => panic!("unexpected error type: {other}"),
        }
    }

    #[test]
    fn invalid_handler_regex_returns_config_error() {
        let err = match DeviceHandler::new(HandlerConfig {
            prompts: vec![PromptState::new("Login", &[r"["])],
            ..Default::default()
        }) {
            Ok(_) => panic!("invalid regex should fail handler construction"),
            Err(err) => err,
        };

        match err {
            ConnectError::InvalidDeviceHandlerConfig(msg) => {
                assert!(msg.contains("failed to build state regex set"));
            }
            other => panic!("unexpected error type: {other}"),
        }
    }

    #[test]
    fn state_machine_diagnostics_are_clean_for_valid_handler() {
        let report = build_test_handler().diagnose();

        assert!(!report.has_issues(), "{report:?}");
        assert_eq!(report.graph_states, vec!["config", "enable", "login"]);
    }

    #[test]
    fn state_machine_diagnostics_detect_invalid_edges_and_dead_ends() {
        let handler = DeviceHandler::new(HandlerConfig {
            prompts: vec![
                PromptState::new("Login", &[r"^dev>\s*$"]),
                PromptState::new("Enable", &[r"^dev#\s*$"]),
            ],
            transitions: vec![
                Transition::enter("Login", "enable", "Enable"),
                Transition::enter("Enable", "to-ghost", "Ghost"),
            ],
            ..Default::default()
        })
        .expect("handler should build");

        let report = handler.diagnose();
        assert!(report.has_issues());
        assert_eq!(report.missing_edge_targets, vec!["ghost".to_string()]);
        assert_eq!(report.dead_end_states, vec!["enable".to_string()]);
    }

    #[test]
    fn state_machine_diagnostics_detect_duplicate_prompt_patterns() {
        let handler = DeviceHandler::new(HandlerConfig {
            prompts: vec![
                PromptState::new("Login", &[r"^dup>\s*$"]),
                PromptState::new("Enable", &[r"^dup>\s*$"]),
            ],
            transitions: vec![
                Transition::enter("Login", "noop", "Enable"),
                Transition::exit("Enable", "noop", "Login"),
            ],
            ..Default::default()
        })
        .expect("handler should build");

        let report = handler.diagnose();
        assert!(report.has_issues());
        assert_eq!(report.duplicate_prompt_patterns.len(), 1);
        assert!(report.duplicate_prompt_patterns[0].ends_with("=> enable,login"));
    }

    #[test]
    fn state_machine_diagnostics_detect_self_loop_only_states() {
        let handler = DeviceHandler::new(HandlerConfig {
            prompts: vec![PromptState::new("Enable", &[r"^dev#\s*$"])],
            transitions: vec![Transition::enter("Enable", "noop", "Enable")],
            ..Default::default()
        })
        .expect("handler should build");

        let report = handler.diagnose();
        assert!(report.self_loop_only_states.contains(&"enable".to_string()));
    }
}
