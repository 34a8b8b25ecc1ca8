//! Bone naming tables for the playable characters.
//!
//! Each table assigns a bone index to the named slots in [BONE_SLOT_NAMES].
//! Characters use different subsets of the slots and list their bones in different orders.
use crate::error::UnknownCharacterError;

/// The slot is not used by the character.
const N: i8 = -1;

/// The number of named bone slots.
pub const BONE_SLOT_COUNT: usize = 54;

/// The names for each bone slot shared by all characters.
pub const BONE_SLOT_NAMES: [&str; BONE_SLOT_COUNT] = [
    "root",
    "upperbody",
    "lowerbody",
    "neck",
    "collar0",
    "collar1",
    "collar2",
    "collar3",
    "collar4",
    "collar5",
    "breast_L",
    "breast_R",
    "cape0",
    "cape1",
    "cape2",
    "cape3",
    "cape4",
    "cape5",
    "head",
    "hair0",
    "hair1",
    "hair2",
    "hair3",
    "hair4",
    "hair5",
    "shoulder_L",
    "shoulder_R",
    "arm_L",
    "arm_R",
    "forearm_L",
    "forearm_R",
    "hand_L",
    "hand_R",
    "weap0",
    "weap1",
    "weap2",
    "weap3",
    "weap4",
    "weap5",
    "weap6",
    "hip_L",
    "hip_R",
    "belt0",
    "belt1",
    "belt2",
    "belt3",
    "belt4",
    "belt5",
    "thigh_L",
    "thigh_R",
    "tibia_L",
    "tibia_R",
    "foot_L",
    "foot_R",
];

/// The bone naming table for a group of models of the same character.
#[derive(Debug, PartialEq, Eq)]
pub struct CharacterProfile {
    pub name: &'static str,
    /// The model ids like "d000" using this profile.
    pub model_ids: &'static [&'static str],
    /// The bone index for each slot in [BONE_SLOT_NAMES] or `-1` if the slot is unused.
    pub slots: [i8; BONE_SLOT_COUNT],
}

impl CharacterProfile {
    /// Finds the profile for a model id like "d000".
    pub fn lookup(model_id: &str) -> Result<&'static CharacterProfile, UnknownCharacterError> {
        PROFILES
            .iter()
            .find(|p| p.model_ids.contains(&model_id))
            .ok_or_else(|| UnknownCharacterError(model_id.to_string()))
    }

    /// The profile assigning bone `i` to slot `i`.
    pub fn identity() -> &'static CharacterProfile {
        &IDENTITY
    }

    /// The name for the bone at `bone_index`.
    /// Bones without a slot are named like "bone_60".
    pub fn bone_name(&self, bone_index: usize) -> String {
        self.slots
            .iter()
            .position(|s| *s >= 0 && *s as usize == bone_index)
            .map(|slot| BONE_SLOT_NAMES[slot].to_string())
            .unwrap_or_else(|| format!("bone_{}", bone_index))
    }

    /// The names for the first `bone_count` bones.
    pub fn bone_names(&self, bone_count: usize) -> Vec<String> {
        (0..bone_count).map(|i| self.bone_name(i)).collect()
    }
}

static IDENTITY: CharacterProfile = CharacterProfile {
    name: "identity",
    model_ids: &[],
    slots: identity_slots(),
};

const fn identity_slots() -> [i8; BONE_SLOT_COUNT] {
    let mut slots = [0i8; BONE_SLOT_COUNT];
    let mut i = 0;
    while i < BONE_SLOT_COUNT {
        slots[i] = i as i8;
        i += 1;
    }
    slots
}

#[rustfmt::skip]
static PROFILES: [CharacterProfile; 7] = [
    CharacterProfile {
        name: "squall",
        model_ids: &["d000", "d001", "d002", "d003", "d004", "d005", "d006", "d007", "d049", "d052", "d053"],
        slots: [
            0, 1, 2, 4, N, N, N, N, N,
            N, 3, 5, N, N, N, N, N, N,
            9, N, N, N, N, N, N, 8, 10,
            13, 14, 17, 18, 21, 22, 23, 24, N,
            N, N, N, N, 6, 7, N, N, N,
            N, N, N, 11, 12, 15, 16, 19, 20,
        ],
    },
    CharacterProfile {
        name: "zell",
        model_ids: &["d009", "d010", "d011", "d012", "d014"],
        slots: [
            0, 1, 2, 4, N, N, N, N, N,
            N, 3, 5, N, N, N, N, N, N,
            9, N, N, N, N, N, N, 8, 10,
            13, 14, 17, 18, 21, 22, N, N, N,
            N, N, N, N, 7, 6, N, N, N,
            N, N, N, 12, 11, 16, 15, 20, 19,
        ],
    },
    CharacterProfile {
        name: "irvine",
        model_ids: &["d015", "d016", "d017"],
        slots: [
            0, 1, 2, 4, 5, 11, N, N, N,
            N, 3, 6, 12, 19, 26, 13, 20, 27,
            10, 18, 25, 32, N, N, N, 9, 14,
            17, 21, 24, 28, 31, 33, N, N, N,
            N, N, N, N, 7, 8, N, N, N,
            N, N, N, 15, 16, 22, 23, 29, 30,
        ],
    },
    CharacterProfile {
        name: "quistis",
        model_ids: &["d018", "d019", "d020", "d021", "d050"],
        slots: [
            0, 1, 2, 4, N, N, N, N, N,
            N, 3, 5, N, N, N, N, N, N,
            9, 14, 20, 15, 21, N, N, 8, 10,
            13, 16, 19, 22, 25, 26, N, N, N,
            N, N, N, N, 6, 7, N, N, N,
            N, N, N, 11, 12, 17, 18, 23, 24,
        ],
    },
    CharacterProfile {
        name: "rinoa",
        model_ids: &["d022", "d023", "d024", "d025", "d026", "d051", "d075"],
        slots: [
            0, 1, 2, 4, N, N, N, N, N,
            N, 3, 5, N, N, N, N, N, N,
            10, 16, 22, 27, 29, 30, 31, 9, 11,
            15, 17, 21, 23, 26, 28, N, N, N,
            N, N, N, N, 7, 8, 6, 12, 18,
            N, N, N, 13, 14, 19, 20, 24, 25,
        ],
    },
    CharacterProfile {
        name: "selphie",
        model_ids: &["d027", "d028", "d029", "d030"],
        slots: [
            0, 1, 2, 4, N, N, N, N, N,
            N, 3, 5, N, N, N, N, N, N,
            9, 14, 19, N, N, N, N, 8, 10,
            13, 15, 18, 20, 23, 24, N, N, N,
            N, N, N, N, 6, 7, N, N, N,
            N, N, N, 11, 12, 16, 17, 21, 22,
        ],
    },
    CharacterProfile {
        name: "seifer",
        model_ids: &["d032", "d033", "d034", "d035", "d036", "d037", "d065"],
        slots: [
            0, 1, 2, 6, 8, 20, 5, 17, 24,
            26, 4, 7, 3, 11, 12, 14, 13, 15,
            18, N, N, N, N, N, N, 16, 19,
            27, 28, 35, 36, 39, 40, 41, N, N,
            N, N, N, N, 10, 9, 23, 31, 32,
            25, 33, 34, 22, 21, 30, 29, 38, 37,
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_characters() {
        assert_eq!("squall", CharacterProfile::lookup("d000").unwrap().name);
        assert_eq!("squall", CharacterProfile::lookup("d053").unwrap().name);
        assert_eq!("rinoa", CharacterProfile::lookup("d075").unwrap().name);
        assert_eq!("seifer", CharacterProfile::lookup("d065").unwrap().name);
    }

    #[test]
    fn lookup_unknown_character() {
        let error = CharacterProfile::lookup("o001").unwrap_err();
        assert_eq!("o001", error.0);
    }

    #[test]
    fn tables_have_unique_bone_indices() {
        for profile in PROFILES.iter().chain(std::iter::once(CharacterProfile::identity())) {
            let mut used: Vec<_> = profile.slots.iter().filter(|s| **s >= 0).collect();
            let count = used.len();
            used.sort();
            used.dedup();
            assert_eq!(count, used.len(), "{}", profile.name);
        }
    }

    #[test]
    fn model_ids_are_unique() {
        let mut ids: Vec<_> = PROFILES.iter().flat_map(|p| p.model_ids.iter()).collect();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(count, ids.len());
    }

    #[test]
    fn squall_bone_names() {
        let names = CharacterProfile::lookup("d000").unwrap().bone_names(26);
        assert_eq!("root", names[0]);
        assert_eq!("breast_L", names[3]);
        assert_eq!("neck", names[4]);
        assert_eq!("head", names[9]);
        assert_eq!("weap0", names[23]);
        assert_eq!("weap1", names[24]);
        // Squall only uses 25 bones.
        assert_eq!("bone_25", names[25]);
    }

    #[test]
    fn seifer_cape_names() {
        let profile = CharacterProfile::lookup("d032").unwrap();
        assert_eq!("cape0", profile.bone_name(3));
        assert_eq!("belt5", profile.bone_name(34));
    }

    #[test]
    fn identity_bone_names() {
        let names = CharacterProfile::identity().bone_names(56);
        assert_eq!("root", names[0]);
        assert_eq!("foot_R", names[53]);
        assert_eq!("bone_54", names[54]);
        assert_eq!("bone_55", names[55]);
    }
}
