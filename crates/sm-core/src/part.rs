use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The closed set of anatomical locations a body is made of.
///
/// Parts are never created or destroyed at runtime; they are the vertex set
/// of the [`AnatomicalGraph`](crate::anatomy::AnatomicalGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    Neck,
    Chest,
    Abdomen,
    Pelvis,
    LeftShoulder,
    LeftUpperArm,
    LeftForearm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightForearm,
    RightHand,
    LeftThigh,
    LeftShin,
    LeftFoot,
    RightThigh,
    RightShin,
    RightFoot,
}

impl BodyPart {
    /// Every body part, in declaration order.
    pub const ALL: [BodyPart; 19] = [
        Self::Head,
        Self::Neck,
        Self::Chest,
        Self::Abdomen,
        Self::Pelvis,
        Self::LeftShoulder,
        Self::LeftUpperArm,
        Self::LeftForearm,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightUpperArm,
        Self::RightForearm,
        Self::RightHand,
        Self::LeftThigh,
        Self::LeftShin,
        Self::LeftFoot,
        Self::RightThigh,
        Self::RightShin,
        Self::RightFoot,
    ];

    /// Snake-case name used for display, export keys and parsing.
    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Neck => "neck",
            Self::Chest => "chest",
            Self::Abdomen => "abdomen",
            Self::Pelvis => "pelvis",
            Self::LeftShoulder => "left_shoulder",
            Self::LeftUpperArm => "left_upper_arm",
            Self::LeftForearm => "left_forearm",
            Self::LeftHand => "left_hand",
            Self::RightShoulder => "right_shoulder",
            Self::RightUpperArm => "right_upper_arm",
            Self::RightForearm => "right_forearm",
            Self::RightHand => "right_hand",
            Self::LeftThigh => "left_thigh",
            Self::LeftShin => "left_shin",
            Self::LeftFoot => "left_foot",
            Self::RightThigh => "right_thigh",
            Self::RightShin => "right_shin",
            Self::RightFoot => "right_foot",
        }
    }

    /// Returns true for parts on the left or right side of the body.
    pub fn is_limb(self) -> bool {
        !matches!(
            self,
            Self::Head | Self::Neck | Self::Chest | Self::Abdomen | Self::Pelvis
        )
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BodyPart {
    type Err = CoreError;

    /// Parse a part name. Case-insensitive; `-`, spaces and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == normalized || p.name().replace('_', "") == normalized)
            .ok_or_else(|| CoreError::UnknownBodyPart(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = BodyPart::ALL.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BodyPart::ALL.len());
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!("chest".parse::<BodyPart>().unwrap(), BodyPart::Chest);
        assert_eq!(
            "Left-Forearm".parse::<BodyPart>().unwrap(),
            BodyPart::LeftForearm
        );
        assert_eq!(
            "right upper arm".parse::<BodyPart>().unwrap(),
            BodyPart::RightUpperArm
        );
        assert_eq!("leftshin".parse::<BodyPart>().unwrap(), BodyPart::LeftShin);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "tail".parse::<BodyPart>().unwrap_err();
        assert!(err.to_string().contains("tail"));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for part in BodyPart::ALL {
            assert_eq!(part.to_string().parse::<BodyPart>().unwrap(), part);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&BodyPart::LeftUpperArm).unwrap();
        assert_eq!(json, "\"left_upper_arm\"");
    }
}
