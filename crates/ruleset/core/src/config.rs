/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Actor types a `modifier` rule is implicitly restricted to.
    pub modifier_actor_types: Vec<String>,

    /// Emit a warning when a formula references a path missing from its context.
    pub warn_missing_paths: bool,

    /// Priorities used when a rule omits `priority`.
    pub default_priorities: DefaultPriorities,
}

impl EngineConfig {
    // ===== compile-time constants =====
    /// Ability keys, in sheet order.
    pub const ABILITIES: [&'static str; 6] = ["str", "dex", "con", "int", "wis", "cha"];

    /// Skill key and its default governing ability.
    pub const SKILLS: [(&'static str, &'static str); 18] = [
        ("acr", "dex"),
        ("ani", "wis"),
        ("arc", "int"),
        ("ath", "str"),
        ("dec", "cha"),
        ("his", "int"),
        ("ins", "wis"),
        ("itm", "cha"),
        ("inv", "int"),
        ("med", "wis"),
        ("nat", "int"),
        ("prc", "wis"),
        ("prf", "cha"),
        ("per", "cha"),
        ("rel", "int"),
        ("slt", "dex"),
        ("ste", "dex"),
        ("sur", "wis"),
    ];

    /// Actor type that owns a full character sheet.
    pub const CHARACTER_TYPE: &'static str = "character";

    /// Item type whose `system.levels` contribute to the character level.
    pub const CLASS_ITEM_TYPE: &'static str = "class";

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MODIFIER_PRIORITY: i32 = 100;
    pub const DEFAULT_SCALE_VALUE_PRIORITY: i32 = 0;

    pub fn new() -> Self {
        Self {
            modifier_actor_types: vec![Self::CHARACTER_TYPE.to_string()],
            warn_missing_paths: true,
            default_priorities: DefaultPriorities::default(),
        }
    }

    pub fn with_modifier_actor_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifier_actor_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_warn_missing_paths(mut self, warn: bool) -> Self {
        self.warn_missing_paths = warn;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fallback priorities for rule types that do not derive one from their data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DefaultPriorities {
    pub modifier: i32,
    pub scale_value: i32,
}

impl Default for DefaultPriorities {
    fn default() -> Self {
        Self {
            modifier: EngineConfig::DEFAULT_MODIFIER_PRIORITY,
            scale_value: EngineConfig::DEFAULT_SCALE_VALUE_PRIORITY,
        }
    }
}
