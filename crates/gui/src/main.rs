//! rattrap GUI: iced-based desktop application for G300 profile configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use iced::widget::{button, column, container, pick_list, radio, row, scrollable, text, text_input};
use iced::{Element, Length, Task as IcedTask, Theme};
use tracing::{error, info, warn};

use rattrap_core::error::{Error, PERMISSION_HINT};
use rattrap_core::profile::{Field, ProfileId, ProfileSettings};
use rattrap_core::runner::CommandRunner;
use rattrap_core::session::{self, Session};
use rattrap_core::store::{self, SettingsStore};
use rattrap_core::tool::{Ratslap, ResetTarget, KEYS_OPTION};

const DEFAULT_TRANSFER_FILE: &str = "rattrap-profiles.json";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = match App::boot() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Something went wrong talking to ratslap.\n\nOriginal error message was:\n{e}");
            if matches!(e, Error::PermissionDenied(_)) {
                eprintln!("\n{PERMISSION_HINT}");
            }
            return ExitCode::FAILURE;
        }
    };

    let result = iced::application("Rattrap", App::update, App::view)
        .theme(|_| Theme::Dark)
        .window_size((420.0, 760.0))
        .run_with(move || (app, IcedTask::none()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "GUI terminated");
            ExitCode::FAILURE
        }
    }
}

/// Where the window gets its data from.
enum Backend {
    /// Tool not located yet; only the store is open.
    NeedsTool(SettingsStore),
    Ready(Session),
}

/// Button binding being edited.
struct BindingEditor {
    field: Field,
    value: String,
}

/// Application state.
struct App {
    backend: Option<Backend>,
    settings: Option<ProfileSettings>,
    colours: Vec<String>,
    rates: Vec<String>,
    keys: Vec<String>,
    editor: Option<BindingEditor>,
    pending_reset: Option<ResetTarget>,
    tool_path_input: String,
    transfer_path: String,
    status: String,
}

#[derive(Debug, Clone)]
enum Message {
    ProfileSelected(ProfileId),
    ColourSelected(String),
    RateSelected(String),
    EditBinding(Field),
    BindingInput(String),
    BindingKeyPicked(String),
    SaveBinding,
    CancelBinding,
    Apply,
    ResetRequested(ResetTarget),
    ResetConfirmed,
    ResetCancelled,
    TransferPathChanged(String),
    Export,
    Import,
    ToolPathChanged(String),
    ToolPathSubmitted,
}

impl App {
    /// Open the store and, if a tool path is known, the tool.
    ///
    /// Errors here are fatal: the tool exists but cannot reach the mouse.
    fn boot() -> Result<Self, Error> {
        let db_path = store::default_db_path()?;
        let store = SettingsStore::open(&db_path)?;

        let mut app = Self {
            backend: None,
            settings: None,
            colours: Vec::new(),
            rates: Vec::new(),
            keys: Vec::new(),
            editor: None,
            pending_reset: None,
            tool_path_input: String::new(),
            transfer_path: DEFAULT_TRANSFER_FILE.to_string(),
            status: String::new(),
        };

        let stored = session::locate_tool(&store)?;
        let tool = match stored.map(Ratslap::open) {
            Some(Ok(tool)) => tool,
            Some(Err(Error::InvalidToolPath(path))) => {
                warn!(path = %path.display(), "Stored ratslap path no longer valid");
                app.tool_path_input = path.display().to_string();
                app.status = "The stored ratslap path is not valid. Select the ratslap program.".into();
                app.backend = Some(Backend::NeedsTool(store));
                return Ok(app);
            }
            Some(Err(e)) => return Err(e),
            None => {
                app.status = "Select the path to the 'ratslap' program.".into();
                app.backend = Some(Backend::NeedsTool(store));
                return Ok(app);
            }
        };

        tool.probe()?;
        app.start_session(Session::new(store, tool))?;
        Ok(app)
    }

    fn start_session(&mut self, session: Session) -> Result<(), Error> {
        let (choices, failure) = picker_choices(session.tool());
        self.colours = choices.colours;
        self.rates = choices.rates;
        self.keys = choices.keys;
        self.backend = Some(Backend::Ready(session));
        self.load(ProfileId::F3)?;
        if let Some(e) = failure {
            self.report(e);
        }
        Ok(())
    }

    fn session(&mut self) -> Option<&mut Session> {
        match self.backend.as_mut() {
            Some(Backend::Ready(session)) => Some(session),
            _ => None,
        }
    }

    fn current(&self) -> ProfileId {
        match &self.backend {
            Some(Backend::Ready(session)) => session.current().unwrap_or(ProfileId::F3),
            _ => ProfileId::F3,
        }
    }

    fn load(&mut self, id: ProfileId) -> Result<(), Error> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        let settings = session.load_profile(id)?;
        self.settings = Some(settings);
        self.editor = None;
        Ok(())
    }

    /// Re-read the current profile from the store after an edit.
    fn refresh(&mut self) -> Result<(), Error> {
        let id = self.current();
        let Some(session) = self.session() else {
            return Ok(());
        };
        self.settings = session.store().profile(id)?;
        Ok(())
    }

    fn edit(&mut self, field: Field, value: &str) {
        let id = self.current();
        let Some(session) = self.session() else {
            return;
        };
        let result = session
            .set_field(id, field, value)
            .and_then(|()| self.refresh());
        match result {
            Ok(()) => self.status = format!("{id}: {field} set to {value} (not applied yet)"),
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, e: Error) {
        warn!(error = %e, "Operation failed");
        self.status = match e {
            Error::PermissionDenied(_) => format!("{e}\n{PERMISSION_HINT}"),
            other => other.to_string(),
        };
    }

    fn update(&mut self, message: Message) -> IcedTask<Message> {
        match message {
            Message::ProfileSelected(id) => match self.load(id) {
                Ok(()) => self.status = format!("Profile {id} selected"),
                Err(e) => self.report(e),
            },
            Message::ColourSelected(colour) => self.edit(Field::Color, &colour),
            Message::RateSelected(rate) => self.edit(Field::Rate, &rate),
            Message::EditBinding(field) => {
                let value = self
                    .settings
                    .as_ref()
                    .map(|s| s.get(field).to_string())
                    .unwrap_or_default();
                self.editor = Some(BindingEditor { field, value });
            }
            Message::BindingInput(value) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.value = value;
                }
            }
            Message::BindingKeyPicked(key) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.value = append_key(&editor.value, &key);
                }
            }
            Message::SaveBinding => {
                if let Some(editor) = self.editor.take() {
                    self.edit(editor.field, &editor.value);
                }
            }
            Message::CancelBinding => self.editor = None,
            Message::Apply => {
                let Some(session) = self.session() else {
                    return IcedTask::none();
                };
                match session.apply() {
                    Ok(applied) => {
                        let changed: Vec<String> = applied
                            .iter()
                            .filter(|(_, fields)| !fields.is_empty())
                            .map(|(id, fields)| format!("{id} ({})", fields.len()))
                            .collect();
                        self.status = if changed.is_empty() {
                            "Mouse already matches the stored profiles".into()
                        } else {
                            format!("Applied: {}", changed.join(", "))
                        };
                        info!(status = %self.status, "Apply finished");
                    }
                    Err(e) => self.report(e),
                }
            }
            Message::ResetRequested(target) => self.pending_reset = Some(target),
            Message::ResetCancelled => self.pending_reset = None,
            Message::ResetConfirmed => {
                let Some(target) = self.pending_reset.take() else {
                    return IcedTask::none();
                };
                let Some(session) = self.session() else {
                    return IcedTask::none();
                };
                match session.reset(target) {
                    Ok(settings) => {
                        if settings.is_some() {
                            self.settings = settings;
                        }
                        self.editor = None;
                        self.status = match target {
                            ResetTarget::All => "All profiles reset to their defaults".into(),
                            ResetTarget::One(id) => format!("{id} reset to its defaults"),
                        };
                    }
                    Err(e) => self.report(e),
                }
            }
            Message::TransferPathChanged(path) => self.transfer_path = path,
            Message::Export => {
                let path = PathBuf::from(self.transfer_path.trim());
                let Some(session) = self.session() else {
                    return IcedTask::none();
                };
                match session.export_profiles(&path) {
                    Ok(n) => self.status = format!("Exported {n} profile(s) to {}", path.display()),
                    Err(e) => self.report(e),
                }
            }
            Message::Import => {
                let path = PathBuf::from(self.transfer_path.trim());
                let Some(session) = self.session() else {
                    return IcedTask::none();
                };
                let result = session
                    .import_profiles(&path)
                    .and_then(|n| self.refresh().map(|()| n));
                match result {
                    Ok(n) => {
                        self.status = format!(
                            "Imported {n} profile(s) from {} (not applied yet)",
                            path.display()
                        )
                    }
                    Err(e) => self.report(e),
                }
            }
            Message::ToolPathChanged(path) => self.tool_path_input = path,
            Message::ToolPathSubmitted => self.submit_tool_path(),
        }
        IcedTask::none()
    }

    fn submit_tool_path(&mut self) {
        let path = PathBuf::from(self.tool_path_input.trim());
        let tool = match Ratslap::open(path) {
            Ok(tool) => tool,
            Err(e) => return self.report(e),
        };
        let store = match self.backend.take() {
            Some(Backend::NeedsTool(store)) => store,
            other => {
                self.backend = other;
                return;
            }
        };

        if let Err(e) = tool.probe() {
            self.backend = Some(Backend::NeedsTool(store));
            return self.report(e);
        }
        let session = Session::new(store, tool);

        let started = session
            .remember_tool_path()
            .and_then(|()| self.start_session(session));
        match started {
            Ok(()) => self.status = "ratslap located".into(),
            Err(e) => self.report(e),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let header = column![
            text("Rattrap").size(30),
            text("Logitech G300 profiles via ratslap").size(14),
        ]
        .spacing(4);

        let body: Element<'_, Message> = match &self.backend {
            Some(Backend::Ready(_)) => self.view_profile(),
            _ => self.view_locate(),
        };

        let content = column![header, body, text(&self.status).size(14)]
            .spacing(14)
            .padding(16);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn view_locate(&self) -> Element<'_, Message> {
        container(
            column![
                text("ratslap location").size(18),
                text_input("/usr/local/bin/ratslap", &self.tool_path_input)
                    .on_input(Message::ToolPathChanged)
                    .on_submit(Message::ToolPathSubmitted),
                button("Use this program").on_press(Message::ToolPathSubmitted),
            ]
            .spacing(8),
        )
        .padding(12)
        .width(Length::Fill)
        .into()
    }

    fn view_profile(&self) -> Element<'_, Message> {
        let current = self.current();
        let profiles = ProfileId::ALL.iter().fold(row![].spacing(16), |r, id| {
            r.push(radio(id.to_string(), *id, Some(current), Message::ProfileSelected))
        });

        let Some(settings) = &self.settings else {
            return column![profiles, text("No profile loaded")].spacing(10).into();
        };

        let selected_colour = Some(title_case(&settings.color));
        let selected_rate = Some(settings.rate.clone());
        let performance = column![
            row![
                text("Colour").width(Length::Fixed(110.0)),
                pick_list(self.colours.clone(), selected_colour, Message::ColourSelected),
            ]
            .spacing(10),
            row![
                text("Report rate").width(Length::Fixed(110.0)),
                pick_list(self.rates.clone(), selected_rate, Message::RateSelected),
            ]
            .spacing(10),
        ]
        .spacing(8);

        let mut dpi = column![text("DPI").size(18)].spacing(4);
        for field in Field::DPI_LEVELS.iter().chain([&Field::DpiShift]) {
            dpi = dpi.push(
                row![
                    text(field.label().unwrap_or_default()).width(Length::Fixed(110.0)),
                    text(settings.get(*field)),
                ]
                .spacing(10),
            );
        }

        let mut buttons = column![text("Buttons").size(18)].spacing(6);
        for field in Field::BUTTONS {
            let label = field.label().unwrap_or_default();
            let line: Element<'_, Message> = match &self.editor {
                Some(editor) if editor.field == *field => column![
                    text(label),
                    text_input("Key or LeftCtrl + key", &editor.value)
                        .on_input(Message::BindingInput)
                        .on_submit(Message::SaveBinding),
                    row![
                        pick_list(self.keys.clone(), None::<String>, Message::BindingKeyPicked)
                            .placeholder("Insert key"),
                        button("Save").on_press(Message::SaveBinding),
                        button("Cancel").on_press(Message::CancelBinding),
                    ]
                    .spacing(8),
                ]
                .spacing(4)
                .into(),
                _ => row![
                    text(label).width(Length::Fixed(160.0)),
                    button(text(settings.get(*field)))
                        .on_press(Message::EditBinding(*field))
                        .width(Length::Fill),
                ]
                .spacing(10)
                .into(),
            };
            buttons = buttons.push(line);
        }

        let reset: Element<'_, Message> = match self.pending_reset {
            Some(target) => {
                let question = match target {
                    ResetTarget::All => "Reset all profiles to their defaults?".to_string(),
                    ResetTarget::One(id) => format!("Reset profile {id} to its defaults?"),
                };
                row![
                    text(question),
                    button("Yes").on_press(Message::ResetConfirmed),
                    button("No").on_press(Message::ResetCancelled),
                ]
                .spacing(8)
                .into()
            }
            None => row![
                button("Reset profile").on_press(Message::ResetRequested(ResetTarget::One(current))),
                button("Reset all").on_press(Message::ResetRequested(ResetTarget::All)),
                button("Apply").on_press(Message::Apply),
            ]
            .spacing(8)
            .into(),
        };

        let transfer = row![
            text_input("profiles.json", &self.transfer_path)
                .on_input(Message::TransferPathChanged)
                .width(Length::Fill),
            button("Import").on_press(Message::Import),
            button("Export").on_press(Message::Export),
        ]
        .spacing(8);

        column![profiles, performance, dpi, buttons, reset, transfer]
            .spacing(14)
            .into()
    }
}

/// `cyan` -> `Cyan`, the way the colour list is shown.
fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Add a picked key to a binding: completes a `Modifier +` prefix, otherwise replaces it.
fn append_key(current: &str, key: &str) -> String {
    let trimmed = current.trim_end();
    if trimmed.ends_with('+') {
        format!("{trimmed} {key}")
    } else {
        key.to_string()
    }
}

/// Values offered by the colour, rate and key pickers.
#[derive(Debug, Default)]
struct Choices {
    colours: Vec<String>,
    rates: Vec<String>,
    keys: Vec<String>,
}

/// Ask ratslap for every picker list. A list that cannot be read stays
/// empty and the first failure is handed back for the status line.
fn picker_choices<R: CommandRunner>(tool: &Ratslap<R>) -> (Choices, Option<Error>) {
    let mut failure = None;
    let mut values = |option: &str| match tool.valid_values(option) {
        Ok(values) => values,
        Err(e) => {
            warn!(option, error = %e, "Cannot list values");
            failure.get_or_insert(e);
            Vec::new()
        }
    };
    let choices = Choices {
        colours: values("colour").iter().map(|c| title_case(c)).collect(),
        rates: values("rate"),
        keys: values(KEYS_OPTION),
    };
    (choices, failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use rattrap_core::error::Result as CoreResult;
    use rattrap_core::runner::ToolOutput;

    const HELP: &str = "ratslap - Linux configuration tool for Logitech mice\n\
        <colour> can be: red, green, blue or white\n\
        <rate> can be: 125, 250, 500 or 1000\n";

    /// Answers `-h` but cannot reach the mouse for `--listkeys`.
    struct NoKeysRunner;

    impl CommandRunner for NoKeysRunner {
        fn run(&self, _program: &Path, args: &[String]) -> CoreResult<ToolOutput> {
            match args.first().map(String::as_str) {
                Some("-h") => Ok(ToolOutput::ok(HELP)),
                _ => Ok(ToolOutput::failed(
                    "libusb couldn't open USB device /dev/bus/usb/001/004: Permission denied.",
                )),
            }
        }

        fn run_with_timeout(
            &self,
            program: &Path,
            args: &[String],
            _timeout: Duration,
        ) -> CoreResult<Option<ToolOutput>> {
            self.run(program, args).map(Some)
        }
    }

    #[test]
    fn picker_choices_reports_unreadable_list() {
        let tool = Ratslap::with_runner("/usr/bin/ratslap", NoKeysRunner).unwrap();
        let (choices, failure) = picker_choices(&tool);
        assert_eq!(choices.colours, ["Red", "Green", "Blue", "White"]);
        assert_eq!(choices.rates, ["125", "250", "500", "1000"]);
        assert!(choices.keys.is_empty());
        assert!(matches!(failure, Some(Error::PermissionDenied(_))));
    }

    #[test]
    fn title_case_capitalizes_first_letter() {
        assert_eq!(title_case("cyan"), "Cyan");
        assert_eq!(title_case("MAGENTA"), "Magenta");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn append_key_completes_modifier() {
        assert_eq!(append_key("LeftCtrl +", "C"), "LeftCtrl + C");
        assert_eq!(append_key("LeftCtrl + ", "V"), "LeftCtrl + V");
        assert_eq!(append_key("Button1", "DPIUp"), "DPIUp");
        assert_eq!(append_key("", "Button2"), "Button2");
    }
}
