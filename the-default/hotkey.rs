use std::{
  fmt,
  str::FromStr,
};

use serde_json::json;
use the_lib::{
  Priority,
  Tendril,
  behavior::{
    Action,
    Behavior,
    Payload,
  },
  event::Event,
};
use thiserror::Error;

/// Type of the custom event carrying a pressed key combination.
pub const KEYDOWN: &str = "keyboard.keydown";

/// A key combination such as `mod+shift+z`.
///
/// `mod` is the platform's primary modifier; the host decides whether that is
/// control or command before sending the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
  pub key:     Tendril,
  pub primary: bool,
  pub shift:   bool,
  pub alt:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHotkeyError {
  #[error("empty hotkey literal")]
  Empty,
  #[error("repeated key modifier '{0}+'")]
  Repeated(String),
  #[error("invalid key modifier '{0}+'")]
  InvalidModifier(String),
}

impl Hotkey {
  pub fn new(key: &str) -> Self {
    Self {
      key:     key.to_ascii_lowercase().into(),
      primary: false,
      shift:   false,
      alt:     false,
    }
  }

  pub fn with_primary(mut self) -> Self {
    self.primary = true;
    self
  }

  pub fn with_shift(mut self) -> Self {
    self.shift = true;
    self
  }
}

impl fmt::Display for Hotkey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.primary {
      f.write_str("mod+")?;
    }
    if self.alt {
      f.write_str("alt+")?;
    }
    if self.shift {
      f.write_str("shift+")?;
    }
    f.write_str(&self.key)
  }
}

impl FromStr for Hotkey {
  type Err = ParseHotkeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(ParseHotkeyError::Empty);
    }
    if trimmed == "+" {
      return Ok(Hotkey::new("+"));
    }

    let mut tokens: Vec<_> = trimmed.split('+').collect();
    let key = tokens.pop().ok_or(ParseHotkeyError::Empty)?.trim();
    if key.is_empty() {
      return Err(ParseHotkeyError::Empty);
    }

    let mut hotkey = Hotkey::new(key);
    for token in tokens {
      let modifier = token.trim();
      let flag = match modifier.to_ascii_lowercase().as_str() {
        "mod" | "ctrl" | "cmd" | "meta" => &mut hotkey.primary,
        "shift" => &mut hotkey.shift,
        "alt" | "option" => &mut hotkey.alt,
        _ => return Err(ParseHotkeyError::InvalidModifier(modifier.to_owned())),
      };
      if *flag {
        return Err(ParseHotkeyError::Repeated(modifier.to_owned()));
      }
      *flag = true;
    }
    Ok(hotkey)
  }
}

/// Build the event a host sends for a pressed combination.
pub fn keydown(hotkey: &str) -> Event {
  Event::custom(KEYDOWN, json!({ "hotkey": hotkey }))
}

/// What a bound combination does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyAction {
  ToggleDecorator(Tendril),
  Undo,
  Redo,
}

impl HotkeyAction {
  fn event(&self) -> Event {
    match self {
      Self::ToggleDecorator(decorator) => Event::decorator_toggle(decorator.clone()),
      Self::Undo => Event::HistoryUndo,
      Self::Redo => Event::HistoryRedo,
    }
  }
}

pub fn default_hotkeys() -> Vec<(Hotkey, HotkeyAction)> {
  let decorator = |key: &str, name: &str| {
    (
      Hotkey::new(key).with_primary(),
      HotkeyAction::ToggleDecorator(name.into()),
    )
  };
  vec![
    decorator("b", "strong"),
    decorator("i", "em"),
    decorator("u", "underline"),
    (Hotkey::new("z").with_primary(), HotkeyAction::Undo),
    (Hotkey::new("z").with_primary().with_shift(), HotkeyAction::Redo),
  ]
}

/// One behavior per binding, raising the bound event.
pub fn hotkey_behaviors(bindings: Vec<(Hotkey, HotkeyAction)>) -> Vec<Behavior> {
  bindings
    .into_iter()
    .map(|(hotkey, action)| {
      Behavior::on(KEYDOWN)
        .named(format!("hotkey {hotkey}"))
        .priority(Priority::BUILTIN)
        .guard(move |ctx| {
          let Some(pressed) = ctx.event.payload().and_then(|payload| payload["hotkey"].as_str()) else {
            return Ok(None);
          };
          let Ok(pressed) = pressed.parse::<Hotkey>() else {
            return Ok(None);
          };
          Ok((pressed == hotkey).then(|| Payload::new(action.event())))
        })
        .actions(|_, payload| {
          Ok(
            payload
              .get::<Event>()
              .map(|event| Action::raise(event.clone()))
              .into_iter()
              .collect(),
          )
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_and_display() {
    let hotkey: Hotkey = "Mod+Shift+Z".parse().unwrap();
    assert_eq!(hotkey, Hotkey::new("z").with_primary().with_shift());
    assert_eq!(hotkey.to_string(), "mod+shift+z");
    assert_eq!("+".parse::<Hotkey>().unwrap(), Hotkey::new("+"));
  }

  #[test]
  fn parse_errors() {
    assert_eq!("".parse::<Hotkey>(), Err(ParseHotkeyError::Empty));
    assert_eq!("mod+".parse::<Hotkey>(), Err(ParseHotkeyError::Empty));
    assert_eq!(
      "mod+ctrl+b".parse::<Hotkey>(),
      Err(ParseHotkeyError::Repeated("ctrl".into()))
    );
    assert_eq!(
      "hyper+b".parse::<Hotkey>(),
      Err(ParseHotkeyError::InvalidModifier("hyper".into()))
    );
  }

  #[test]
  fn keydown_payload() {
    let event = keydown("mod+b");
    assert_eq!(event.event_type(), KEYDOWN);
    assert_eq!(event.payload().unwrap()["hotkey"], "mod+b");
  }
}
