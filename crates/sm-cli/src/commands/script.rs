//! Parser for the `--cmd` mini-language.
//!
//! A script is a colon-separated verb followed by its arguments:
//! `damage:chest:80`, `sever:left_forearm`, `feed:20`,
//! `cure:left_shin:50:infection`. Part names accept `-`, `_` or nothing
//! between words.

use sm_core::BodyPart;
use sm_simulation::{BodyEvent, Effect};

/// Default growth rate for `infect` when none is given.
const DEFAULT_GROWTH: f64 = 0.1;

/// Every verb with its argument shape, for error messages.
const USAGE: &[&str] = &[
    "damage:PART:AMOUNT",
    "heal:PART:AMOUNT",
    "bleed:PART:RATE",
    "clot:PART",
    "exert:PART:INTENSITY",
    "rest:PART",
    "infect:PART:SEVERITY[:GROWTH]",
    "cure:PART:POWER[:infection|toxin|both]",
    "poison:PART:SEVERITY",
    "burn:PART:INTENSITY",
    "bandage:PART",
    "unbandage:PART",
    "sever:PART",
    "repair:PART",
    "fracture:PART",
    "set:PART",
    "impact:PART:MAGNITUDE",
    "feed:AMOUNT",
    "hydrate:AMOUNT",
    "shock:INTENSITY",
];

/// Parse one script into the event it stands for.
pub fn parse(script: &str) -> Result<BodyEvent, String> {
    let fields: Vec<&str> = script.split(':').map(str::trim).collect();
    let (verb, args) = fields
        .split_first()
        .ok_or_else(|| format!("empty command \"{script}\""))?;
    let args = Args { script, args };

    let event = match verb.to_ascii_lowercase().as_str() {
        "damage" => BodyEvent::Damage {
            part: args.part(0)?,
            amount: args.number(1)?,
        },
        "heal" => BodyEvent::Heal {
            part: args.part(0)?,
            amount: args.number(1)?,
        },
        "bleed" => BodyEvent::Bleed {
            part: args.part(0)?,
            rate: args.number(1)?,
        },
        "clot" => BodyEvent::Clot { part: args.part(0)? },
        "exert" => BodyEvent::Exert {
            part: args.part(0)?,
            intensity: args.number(1)?,
        },
        "rest" => BodyEvent::Rest { part: args.part(0)? },
        "infect" => BodyEvent::Infect {
            part: args.part(0)?,
            severity: args.number(1)?,
            growth_rate: args.optional_number(2)?.unwrap_or(DEFAULT_GROWTH),
        },
        "cure" => {
            let (cures_infection, cures_toxin) = match args.get(2) {
                None | Some("both") => (true, true),
                Some("infection") => (true, false),
                Some("toxin") => (false, true),
                Some(other) => {
                    return Err(format!(
                        "\"{script}\": cure target must be infection, toxin or both, \
                         got \"{other}\""
                    ));
                }
            };
            BodyEvent::Cure {
                part: args.part(0)?,
                power: args.number(1)?,
                cures_infection,
                cures_toxin,
            }
        }
        "poison" => BodyEvent::Poison {
            part: args.part(0)?,
            severity: args.number(1)?,
        },
        "burn" => BodyEvent::Burn {
            part: args.part(0)?,
            intensity: args.number(1)?,
        },
        "bandage" => BodyEvent::Bandage { part: args.part(0)? },
        "unbandage" => BodyEvent::RemoveBandage { part: args.part(0)? },
        "sever" => BodyEvent::SeverNerve { part: args.part(0)? },
        "repair" => BodyEvent::RepairNerve { part: args.part(0)? },
        "fracture" => BodyEvent::Fracture { part: args.part(0)? },
        "set" => BodyEvent::SetBone { part: args.part(0)? },
        "impact" => BodyEvent::PropagateEffect {
            origin: args.part(0)?,
            effect: Effect::impact(args.number(1)?),
        },
        "feed" => BodyEvent::Feed {
            amount: args.number(0)?,
        },
        "hydrate" => BodyEvent::Hydrate {
            amount: args.number(0)?,
        },
        "shock" => BodyEvent::Shock {
            intensity: args.number(0)?,
        },
        _ => {
            return Err(format!(
                "unknown command \"{verb}\". Use one of: {}",
                USAGE.join(", ")
            ));
        }
    };
    Ok(event)
}

struct Args<'a> {
    script: &'a str,
    args: &'a [&'a str],
}

impl<'a> Args<'a> {
    fn get(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied().filter(|s| !s.is_empty())
    }

    fn required(&self, index: usize, what: &str) -> Result<&'a str, String> {
        self.get(index)
            .ok_or_else(|| format!("\"{}\": missing {what}", self.script))
    }

    fn part(&self, index: usize) -> Result<BodyPart, String> {
        self.required(index, "body part")?
            .parse()
            .map_err(|e| format!("\"{}\": {e}", self.script))
    }

    fn number(&self, index: usize) -> Result<f64, String> {
        let raw = self.required(index, "amount")?;
        self.parse_number(raw)
    }

    fn optional_number(&self, index: usize) -> Result<Option<f64>, String> {
        self.get(index).map(|raw| self.parse_number(raw)).transpose()
    }

    fn parse_number(&self, raw: &str) -> Result<f64, String> {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("\"{}\": \"{raw}\" is not a number", self.script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_part_and_amount() {
        assert_eq!(
            parse("damage:chest:80").unwrap(),
            BodyEvent::Damage {
                part: BodyPart::Chest,
                amount: 80.0
            }
        );
        assert_eq!(
            parse("sever:left-forearm").unwrap(),
            BodyEvent::SeverNerve {
                part: BodyPart::LeftForearm
            }
        );
    }

    #[test]
    fn parses_bodywide_commands() {
        assert_eq!(parse("feed:20").unwrap(), BodyEvent::Feed { amount: 20.0 });
        assert_eq!(
            parse("shock:0.5").unwrap(),
            BodyEvent::Shock { intensity: 0.5 }
        );
    }

    #[test]
    fn infect_growth_is_optional() {
        let BodyEvent::Infect { growth_rate, .. } = parse("infect:left_shin:20").unwrap() else {
            panic!("expected infect");
        };
        assert!((growth_rate - DEFAULT_GROWTH).abs() < f64::EPSILON);
        let BodyEvent::Infect { growth_rate, .. } = parse("infect:left_shin:20:0.3").unwrap() else {
            panic!("expected infect");
        };
        assert!((growth_rate - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn cure_targets() {
        assert_eq!(
            parse("cure:abdomen:40:toxin").unwrap(),
            BodyEvent::Cure {
                part: BodyPart::Abdomen,
                power: 40.0,
                cures_infection: false,
                cures_toxin: true,
            }
        );
        assert!(parse("cure:abdomen:40:curse").is_err());
    }

    #[test]
    fn impact_becomes_a_propagating_effect() {
        assert_eq!(
            parse("impact:head:30").unwrap(),
            BodyEvent::PropagateEffect {
                origin: BodyPart::Head,
                effect: Effect::impact(30.0),
            }
        );
    }

    #[test]
    fn reports_bad_input() {
        let err = parse("damage:tail:10").unwrap_err();
        assert!(err.contains("unknown body part"));
        assert!(parse("damage:chest").unwrap_err().contains("missing amount"));
        assert!(parse("damage:chest:lots").unwrap_err().contains("not a number"));
        assert!(parse("dance:chest").unwrap_err().contains("unknown command"));
        assert!(parse("feed:inf").is_err());
    }
}
