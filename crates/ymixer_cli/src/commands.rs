//! Interactive Commands - one line of stdin each

use anyhow::{bail, Context, Result};
use ymixer_core::{AudioEngine, PresetScope, BAND_COUNT, EQ_BANDS};

pub const HELP: &str = "\
commands:
  band <index> <db>      set band gain (-24..24)
  volume <percent>       set volume boost (0..300)
  bass <db>              set bass boost (0..24)
  save <name>            save current settings as a preset in this scope
  load <key>             apply a stored preset by key
  presets                list presets in this scope
  scope global|<process> switch preset scope
  eq                     show current equalizer
  restart                rebuild the audio pipeline
  status                 show pipeline status
  quit                   exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Band { index: usize, gain_db: i32 },
    Volume(i32),
    Bass(i32),
    Save(String),
    Load(String),
    Presets,
    Scope(PresetScope),
    Equalizer,
    Restart,
    Status,
    Help,
    Quit,
}

fn int_arg(arg: Option<&str>, what: &str) -> Result<i32> {
    let arg = arg.with_context(|| format!("missing {}", what))?;
    arg.parse()
        .with_context(|| format!("invalid {} '{}'", what, arg))
}

/// Parse one command line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let input = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "band" => {
            let index = int_arg(args.next(), "band index")?;
            let gain_db = int_arg(args.next(), "gain")?;
            if !(0..BAND_COUNT as i32).contains(&index) {
                bail!("band index must be 0..{}", BAND_COUNT - 1);
            }
            Input::Band {
                index: index as usize,
                gain_db,
            }
        }
        "volume" => Input::Volume(int_arg(args.next(), "volume")?),
        "bass" => Input::Bass(int_arg(args.next(), "bass boost")?),
        // Preset names may contain spaces
        "save" if !rest.is_empty() => Input::Save(rest.to_string()),
        "load" if !rest.is_empty() => Input::Load(rest.to_string()),
        "save" | "load" => bail!("missing preset name"),
        "presets" => Input::Presets,
        "scope" => match args.next() {
            Some(s) if s.eq_ignore_ascii_case("global") => Input::Scope(PresetScope::Global),
            Some(process) => Input::Scope(PresetScope::Process(process.to_string())),
            None => bail!("missing scope"),
        },
        "eq" => Input::Equalizer,
        "restart" => Input::Restart,
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => bail!("unknown command '{}'", other),
    };
    Ok(Some(input))
}

/// Run one command against the engine. Returns false when the user quits.
pub fn execute(engine: &AudioEngine, input: Input) -> Result<bool> {
    match input {
        Input::Band { index, gain_db } => {
            engine.set_band_gain(index, gain_db)?;
            println!("band {} ({} Hz): {} dB", index, EQ_BANDS[index], gain_db.clamp(-24, 24));
        }
        Input::Volume(percent) => {
            engine.set_volume_boost(percent);
            println!("volume: {}%", engine.equalizer().volume_boost_percent());
        }
        Input::Bass(db) => {
            engine.set_bass_boost(db);
            println!("bass boost: {} dB", engine.equalizer().bass_boost());
        }
        Input::Save(name) => {
            let key = engine.save_preset(&name)?;
            println!("saved '{}'", key);
        }
        Input::Load(key) => {
            engine.load_preset(&key)?;
            println!("loaded '{}'", key);
        }
        Input::Presets => {
            let keys = engine.preset_keys();
            if keys.is_empty() {
                println!("no presets in this scope");
            }
            for key in keys {
                println!("  {}  ({})", key, PresetScope::display_name(&key));
            }
        }
        Input::Scope(scope) => {
            let applied = engine.select_scope(scope.clone());
            let default_key = scope.default_key();
            if applied {
                println!("scope {:?}: applied '{}'", scope, default_key);
            } else {
                println!("scope {:?}: no '{}', equalizer reset", scope, default_key);
            }
        }
        Input::Equalizer => print_equalizer(engine),
        Input::Restart => engine.restart()?,
        Input::Status => {
            let status = engine.status();
            println!("state: {:?}", status.state);
            if let Some(device) = status.device {
                println!(
                    "device: {} ({:?}, {} Hz, {} ch)",
                    device.name, device.kind, device.sample_rate, device.channels
                );
            }
            println!(
                "dropped samples: {}, underruns: {}",
                status.dropped_samples, status.underruns
            );
        }
        Input::Help => println!("{}", HELP),
        Input::Quit => return Ok(false),
    }
    Ok(true)
}

fn print_equalizer(engine: &AudioEngine) {
    let eq = engine.equalizer();
    for (index, gain) in eq.gains().iter().enumerate() {
        println!(
            "  {:>2}  {:>6} Hz  {:>+4} dB  (effective {:>+4} dB)",
            index,
            EQ_BANDS[index],
            gain,
            eq.effective_gain(index)
        );
    }
    println!(
        "  volume {}%, bass boost {} dB",
        eq.volume_boost_percent(),
        eq.bass_boost()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band() {
        assert_eq!(
            parse("band 3 -6").unwrap(),
            Some(Input::Band {
                index: 3,
                gain_db: -6
            })
        );
        assert!(parse("band 10 0").is_err());
        assert!(parse("band 2").is_err());
        assert!(parse("band x 1").is_err());
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("volume 150").unwrap(), Some(Input::Volume(150)));
        assert_eq!(parse("  BASS 4 ").unwrap(), Some(Input::Bass(4)));
    }

    #[test]
    fn test_parse_preset_names_keep_spaces() {
        assert_eq!(
            parse("save Late Night").unwrap(),
            Some(Input::Save("Late Night".into()))
        );
        assert_eq!(
            parse("load Global_Late Night").unwrap(),
            Some(Input::Load("Global_Late Night".into()))
        );
        assert!(parse("save   ").is_err());
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(
            parse("scope global").unwrap(),
            Some(Input::Scope(PresetScope::Global))
        );
        assert_eq!(
            parse("scope vlc").unwrap(),
            Some(Input::Scope(PresetScope::Process("vlc".into())))
        );
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("quit").unwrap(), Some(Input::Quit));
        assert_eq!(parse("status").unwrap(), Some(Input::Status));
        assert!(parse("dance").is_err());
    }
}
