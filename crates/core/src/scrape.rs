//! Text scrapers for ratslap's human-readable output.
//!
//! ratslap has no machine-readable mode, so everything here works line by
//! line on what it prints for `-h`, `-p fN` and `--listkeys`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::profile::{Field, ProfileId, ProfileSettings};

static SETTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<label>[^:]+?)\s*:\s*(?P<value>.*?)\s*$").expect("valid regex")
});

static PERMISSION_DENIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"libusb couldn't open USB device .*: Permission denied").expect("valid regex")
});

/// Parse the output of `ratslap -p <id>` into a full profile.
///
/// Lines that are not `Label: value` with a known label are skipped, so the
/// banner and trailing blank lines do not matter. Every labelled field must
/// be present.
pub fn parse_profile(output: &str, id: ProfileId) -> Result<ProfileSettings> {
    let mut settings = ProfileSettings::empty(id);
    let mut seen = Vec::with_capacity(Field::ALL.len());

    for line in output.lines() {
        let Some(caps) = SETTING_LINE.captures(line) else {
            continue;
        };
        let Some(field) = Field::from_label(&caps["label"]) else {
            trace!(line, "Skipping unlabelled line");
            continue;
        };
        settings.set(field, &caps["value"])?;
        seen.push(field);
    }

    if let Some(missing) = Field::ALL
        .iter()
        .filter(|field| field.label().is_some())
        .find(|field| !seen.contains(*field))
    {
        return Err(Error::Parse(format!(
            "profile {id}: no '{}' line in tool output",
            missing.label().unwrap_or_default()
        )));
    }

    Ok(settings)
}

/// Option names advertised by `ratslap -h`.
///
/// A help line starting with `-` documents one option. Its first token may
/// hold both spellings (`-p|--print`, `-p,--print`); the long name wins.
pub fn parse_options(help: &str) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();

    for line in help.lines() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('-') {
            continue;
        }
        let token = trimmed.split_whitespace().next().unwrap_or_default();
        let spellings: Vec<&str> = token
            .split(['|', ','])
            .map(|s| s.split(['=', '<', '[']).next().unwrap_or_default())
            .filter(|s| s.starts_with('-'))
            .collect();

        let long = spellings.iter().find_map(|s| s.strip_prefix("--"));
        let short = spellings.iter().find_map(|s| s.strip_prefix('-'));
        let Some(name) = long.or(short).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !options.iter().any(|o| o == name) {
            options.push(name.to_string());
        }
    }

    options
}

/// Valid values for `option` as listed in the help text.
///
/// Looks for a line `<option>: a, b, c or d`.
pub fn parse_valid_values(help: &str, option: &str) -> Option<Vec<String>> {
    let marker = format!("<{option}>");
    let line = help
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with(&marker))?;
    let (_, raw) = line.split_once(':')?;
    let values = raw
        .trim()
        .replace(" or ", ", ")
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Some(values)
}

/// Key names printed by `ratslap --listkeys`.
///
/// Everything up to and including the first line ending in `:` is banner;
/// each whitespace-separated token after it is a key name.
pub fn parse_key_names(output: &str) -> Result<Vec<String>> {
    let mut lines = output.lines();
    if !lines.by_ref().any(|line| line.trim_end().ends_with(':')) {
        return Err(Error::Parse("no key list header in tool output".into()));
    }
    Ok(lines
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect())
}

/// The libusb permission error in `stderr`, if that is what went wrong.
pub fn find_permission_denied(stderr: &str) -> Option<&str> {
    PERMISSION_DENIED.find(stderr).map(|m| m.as_str())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Sample ratslap 0.4 output shared by the test suites.

    pub const PRINT_F3: &str = "\
RatSlap v0.4.1 (BUILT: 2021-06-12 04:11:52+1000)
    Linux configuration tool for Logitech mice (currently only G300/G300S)
    Copyright (C) 2016-2021 Todd Harbour (krayon)
    https://gitlab.com/krayon/ratslap

Printing Mode: F3
    Colour: Cyan
    Report Rate: 500
    DPI #1: 500
    DPI #2: (DEF) 1000
    DPI #3: 1500
    DPI #4: 2500
    DPI Shift: NOT SET
    Left Click (But1): Button1
    Right Click (But2): Button2
    Middle Click (But3): Button3
    G4: Button6
    G5: Button7
    G6: LeftCtrl +
    G7: LeftAlt +
    G8: ModeSwitch
    G9: DPICycle

";

    pub const PRINT_F4: &str = "\
RatSlap v0.4.1 (BUILT: 2021-06-12 04:11:52+1000)
    Linux configuration tool for Logitech mice (currently only G300/G300S)
    Copyright (C) 2016-2021 Todd Harbour (krayon)
    https://gitlab.com/krayon/ratslap

Printing Mode: F4
    Colour: White
    Report Rate: 1000
    DPI #1: 500
    DPI #2: (DEF) 1000
    DPI #3: 1500
    DPI #4: 2500
    DPI Shift: 500
    Left Click (But1): Button1
    Right Click (But2): Button2
    Middle Click (But3): Button3
    G4: Button6
    G5: Button7
    G6: DPIDown
    G7: DPIUp
    G8: ModeSwitch
    G9: DPIShift

";

    pub const PRINT_F5: &str = "\
RatSlap v0.4.1 (BUILT: 2021-06-12 04:11:52+1000)
    Linux configuration tool for Logitech mice (currently only G300/G300S)
    Copyright (C) 2016-2021 Todd Harbour (krayon)
    https://gitlab.com/krayon/ratslap

Printing Mode: F5
    Colour: Blue
    Report Rate: 500
    DPI #1: (DEF) 1000
    DPI #2: 1000
    DPI #3: 1000
    DPI #4: 1000
    DPI Shift: NOT SET
    Left Click (But1): Button1
    Right Click (But2): Button2
    Middle Click (But3): Button3
    G4: Button6
    G5: Button7
    G6: LeftCtrl + C
    G7: LeftCtrl + V
    G8: ModeSwitch
    G9: LeftCtrl + X

";

    pub const HELP: &str = "\
RatSlap v0.4.1 (BUILT: 2021-06-12 04:11:52+1000)
    Linux configuration tool for Logitech mice (currently only G300/G300S)
    Copyright (C) 2016-2021 Todd Harbour (krayon)
    https://gitlab.com/krayon/ratslap

Usage: ratslap -h|--help
       ratslap -V|--version
       ratslap [-v|--verbose] [-l|--listkeys] [-s|--select <mode>]
               [-p|--print <mode>] [-m|--modify <mode> [<modopt>...]]

-h|--help            - Displays this help
-V|--version         - Displays version information
-v|--verbose         - Verbose mode
-l|--listkeys        - Lists the keys that can be assigned to buttons
-s|--select <mode>   - Selects the mode to use as the current mode
-p|--print <mode>    - Prints the current configuration of a mode
-m|--modify <mode>   - Modifies a mode, using the options below
--colour <colour>    - Sets the colour of the mode
--rate <rate>        - Sets the report rate
--dpi1 <dpi>         - Sets DPI #1 (prefix with * to make it the default)

<mode>:   F3, F4 or F5
<colour>: black, red, green, yellow, blue, magenta, cyan or white
<rate>:   125, 250, 500 or 1000
<dpi>:    200 - 2500 in increments of 50
";

    pub const LIST_KEYS: &str = "\
RatSlap v0.4.1 (BUILT: 2021-06-12 04:11:52+1000)
    Linux configuration tool for Logitech mice (currently only G300/G300S)
    Copyright (C) 2016-2021 Todd Harbour (krayon)
    https://gitlab.com/krayon/ratslap

Valid keys:
    Button1
    Button2
    Button3
    Button6
    Button7
    DPIUp
    DPIDown
    DPICycle
    DPIShift
    ModeSwitch
    LeftCtrl
    LeftAlt
";

    pub const PERMISSION_STDERR: &str = "\
ERROR: libusb couldn't open USB device /dev/bus/usb/001/007: Permission denied.
ERROR: Failed to open device
";
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn parse_profile_extracts_every_field() {
        let settings = parse_profile(PRINT_F3, ProfileId::F3).unwrap();
        assert_eq!(settings.name, ProfileId::F3);
        assert_eq!(settings.color, "Cyan");
        assert_eq!(settings.rate, "500");
        assert_eq!(settings.dpi1, "500");
        assert_eq!(settings.dpi2, "(DEF) 1000");
        assert_eq!(settings.dpi4, "2500");
        assert_eq!(settings.dpi_shift, "NOT SET");
        assert_eq!(settings.left, "Button1");
        assert_eq!(settings.middle, "Button3");
        assert_eq!(settings.g6, "LeftCtrl +");
        assert_eq!(settings.g9, "DPICycle");
    }

    #[test]
    fn parse_profile_keeps_modifier_combos() {
        let settings = parse_profile(PRINT_F5, ProfileId::F5).unwrap();
        assert_eq!(settings.g6, "LeftCtrl + C");
        assert_eq!(settings.g9, "LeftCtrl + X");
        assert_eq!(settings.dpi1, "(DEF) 1000");
    }

    #[test]
    fn parse_profile_matches_factory_defaults() {
        for (id, output) in [
            (ProfileId::F3, PRINT_F3),
            (ProfileId::F4, PRINT_F4),
            (ProfileId::F5, PRINT_F5),
        ] {
            let parsed = parse_profile(output, id).unwrap();
            let defaults = ProfileSettings::factory_defaults(id);
            assert!(parsed.difference(&defaults).is_empty(), "{id} differs");
        }
    }

    #[test]
    fn parse_profile_splits_on_first_colon_only() {
        let output = PRINT_F3.replace("G8: ModeSwitch", "G8: Shift + :");
        let settings = parse_profile(&output, ProfileId::F3).unwrap();
        assert_eq!(settings.g8, "Shift + :");
    }

    #[test]
    fn parse_profile_reports_missing_field() {
        let output = PRINT_F3.replace("    Report Rate: 500\n", "");
        let err = parse_profile(&output, ProfileId::F3).unwrap_err();
        assert!(err.to_string().contains("Report Rate"));
    }

    #[test]
    fn parse_profile_rejects_empty_output() {
        assert!(parse_profile("", ProfileId::F4).is_err());
    }

    #[test]
    fn parse_options_prefers_long_names() {
        let options = parse_options(HELP);
        assert_eq!(
            options,
            vec![
                "help", "version", "verbose", "listkeys", "select", "print", "modify", "colour",
                "rate", "dpi1"
            ]
        );
    }

    #[test]
    fn parse_options_handles_short_only() {
        let options = parse_options("-x        - something\n  -y=<n>  - other\nnot an option\n");
        assert_eq!(options, vec!["x", "y"]);
    }

    #[test]
    fn parse_valid_values_splits_or() {
        let colours = parse_valid_values(HELP, "colour").unwrap();
        assert_eq!(
            colours,
            vec!["black", "red", "green", "yellow", "blue", "magenta", "cyan", "white"]
        );
        let rates = parse_valid_values(HELP, "rate").unwrap();
        assert_eq!(rates, vec!["125", "250", "500", "1000"]);
        let modes = parse_valid_values(HELP, "mode").unwrap();
        assert_eq!(modes, vec!["F3", "F4", "F5"]);
    }

    #[test]
    fn parse_valid_values_missing_option() {
        assert_eq!(parse_valid_values(HELP, "macro"), None);
    }

    #[test]
    fn parse_key_names_skips_banner() {
        let keys = parse_key_names(LIST_KEYS).unwrap();
        assert_eq!(keys.first().map(String::as_str), Some("Button1"));
        assert_eq!(keys.last().map(String::as_str), Some("LeftAlt"));
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn parse_key_names_without_header_fails() {
        assert!(parse_key_names("Button1\nButton2\n").is_err());
    }

    #[test]
    fn permission_denied_is_detected() {
        let found = find_permission_denied(PERMISSION_STDERR).unwrap();
        assert_eq!(
            found,
            "libusb couldn't open USB device /dev/bus/usb/001/007: Permission denied"
        );
        assert_eq!(find_permission_denied("ERROR: No G300 found"), None);
    }
}
