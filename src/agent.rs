//! Canonical agent catalogue: names, categories and legacy flat-key layout.
//!
//! The legacy strings below are a wire-format contract with the flat
//! `agent_models` consumers; they must not be "tidied up".

// ── Agent Category ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentCategory {
    /// RankAgent, ExtractAgent, SigmaAgent
    Main,
    /// Extraction sub-agents run by ExtractAgent
    SubAgent,
    /// Graders paired 1:1 with a base agent
    Qa,
    /// OS detection fallback LLM
    OsFallback,
}

// ── Agent Name ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentName {
    RankAgent,
    ExtractAgent,
    SigmaAgent,
    CmdlineExtract,
    ProcTreeExtract,
    HuntQueriesExtract,
    RankAgentQA,
    CmdlineQA,
    ProcTreeQA,
    HuntQueriesQA,
    OSDetectionFallback,
}

/// One row of the flat-key layout table.
struct FlatLayout {
    agent: AgentName,
    /// Prefix of `{prefix}_provider`, `{prefix}_temperature`, `{prefix}_top_p`.
    prefix: &'static str,
    /// Key holding the model identifier.
    model_key: &'static str,
}

const FLAT_LAYOUT: [FlatLayout; 11] = [
    FlatLayout { agent: AgentName::RankAgent, prefix: "RankAgent", model_key: "RankAgent" },
    FlatLayout { agent: AgentName::ExtractAgent, prefix: "ExtractAgent", model_key: "ExtractAgent" },
    FlatLayout { agent: AgentName::SigmaAgent, prefix: "SigmaAgent", model_key: "SigmaAgent" },
    FlatLayout { agent: AgentName::CmdlineExtract, prefix: "CmdlineExtract", model_key: "CmdlineExtract_model" },
    FlatLayout { agent: AgentName::ProcTreeExtract, prefix: "ProcTreeExtract", model_key: "ProcTreeExtract_model" },
    FlatLayout { agent: AgentName::HuntQueriesExtract, prefix: "HuntQueriesExtract", model_key: "HuntQueriesExtract_model" },
    FlatLayout { agent: AgentName::RankAgentQA, prefix: "RankAgentQA", model_key: "RankAgentQA" },
    FlatLayout { agent: AgentName::CmdlineQA, prefix: "CmdLineQA", model_key: "CmdLineQA" },
    FlatLayout { agent: AgentName::ProcTreeQA, prefix: "ProcTreeQA", model_key: "ProcTreeQA" },
    FlatLayout { agent: AgentName::HuntQueriesQA, prefix: "HuntQueriesQA", model_key: "HuntQueriesQA" },
    FlatLayout {
        agent: AgentName::OSDetectionFallback,
        prefix: "OSDetectionAgent_fallback",
        model_key: "OSDetectionAgent_fallback",
    },
];

impl AgentName {
    /// All canonical agents, in flat-layout order.
    pub const ALL: [AgentName; 11] = [
        Self::RankAgent,
        Self::ExtractAgent,
        Self::SigmaAgent,
        Self::CmdlineExtract,
        Self::ProcTreeExtract,
        Self::HuntQueriesExtract,
        Self::RankAgentQA,
        Self::CmdlineQA,
        Self::ProcTreeQA,
        Self::HuntQueriesQA,
        Self::OSDetectionFallback,
    ];

    /// Base agents that must be shadowed by a QA agent once configured.
    pub const QA_PAIRS: [(AgentName, AgentName); 4] = [
        (Self::RankAgent, Self::RankAgentQA),
        (Self::CmdlineExtract, Self::CmdlineQA),
        (Self::ProcTreeExtract, Self::ProcTreeQA),
        (Self::HuntQueriesExtract, Self::HuntQueriesQA),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RankAgent => "RankAgent",
            Self::ExtractAgent => "ExtractAgent",
            Self::SigmaAgent => "SigmaAgent",
            Self::CmdlineExtract => "CmdlineExtract",
            Self::ProcTreeExtract => "ProcTreeExtract",
            Self::HuntQueriesExtract => "HuntQueriesExtract",
            Self::RankAgentQA => "RankAgentQA",
            Self::CmdlineQA => "CmdlineQA",
            Self::ProcTreeQA => "ProcTreeQA",
            Self::HuntQueriesQA => "HuntQueriesQA",
            Self::OSDetectionFallback => "OSDetectionFallback",
        }
    }

    pub fn category(&self) -> AgentCategory {
        match self {
            Self::RankAgent | Self::ExtractAgent | Self::SigmaAgent => AgentCategory::Main,
            Self::CmdlineExtract | Self::ProcTreeExtract | Self::HuntQueriesExtract => {
                AgentCategory::SubAgent
            }
            Self::RankAgentQA | Self::CmdlineQA | Self::ProcTreeQA | Self::HuntQueriesQA => {
                AgentCategory::Qa
            }
            Self::OSDetectionFallback => AgentCategory::OsFallback,
        }
    }

    pub fn is_qa(&self) -> bool {
        self.category() == AgentCategory::Qa
    }

    fn layout(&self) -> &'static FlatLayout {
        // FLAT_LAYOUT is indexed in ALL order.
        let layout = &FLAT_LAYOUT[*self as usize];
        debug_assert_eq!(layout.agent, *self);
        layout
    }

    /// Legacy prefix for `_provider` / `_temperature` / `_top_p` keys.
    pub fn flat_prefix(&self) -> &'static str {
        self.layout().prefix
    }

    /// Legacy key carrying the model identifier.
    pub fn model_key(&self) -> &'static str {
        self.layout().model_key
    }

    pub fn provider_key(&self) -> String {
        format!("{}_provider", self.flat_prefix())
    }

    pub fn temperature_key(&self) -> String {
        format!("{}_temperature", self.flat_prefix())
    }

    pub fn top_p_key(&self) -> String {
        format!("{}_top_p", self.flat_prefix())
    }

    /// QA agent paired with this base agent, if any.
    pub fn qa_agent(&self) -> Option<AgentName> {
        Self::QA_PAIRS
            .iter()
            .find(|(base, _)| base == self)
            .map(|(_, qa)| *qa)
    }

    /// Base agent graded by this QA agent, if any.
    pub fn base_agent(&self) -> Option<AgentName> {
        Self::QA_PAIRS
            .iter()
            .find(|(_, qa)| qa == self)
            .map(|(base, _)| *base)
    }

    pub fn is_canonical(name: &str) -> bool {
        name.parse::<AgentName>().is_ok()
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentName {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown agent name: {}", s))
    }
}

/// Base agent expected for a QA-suffixed name that is not in the catalogue.
/// `FooQA` → `Foo`.
pub fn implied_base_name(qa_name: &str) -> Option<String> {
    if let Ok(agent) = qa_name.parse::<AgentName>() {
        return agent.base_agent().map(|b| b.as_str().to_string());
    }
    qa_name
        .strip_suffix("QA")
        .filter(|base| !base.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_all_order() {
        for (i, agent) in AgentName::ALL.iter().enumerate() {
            assert_eq!(FLAT_LAYOUT[i].agent, *agent);
            assert_eq!(*agent as usize, i);
        }
    }

    #[test]
    fn test_flat_keys_follow_legacy_naming() {
        assert_eq!(AgentName::RankAgent.model_key(), "RankAgent");
        assert_eq!(AgentName::CmdlineExtract.model_key(), "CmdlineExtract_model");
        assert_eq!(AgentName::CmdlineExtract.provider_key(), "CmdlineExtract_provider");
        assert_eq!(AgentName::CmdlineQA.model_key(), "CmdLineQA");
        assert_eq!(AgentName::CmdlineQA.top_p_key(), "CmdLineQA_top_p");
        assert_eq!(
            AgentName::OSDetectionFallback.temperature_key(),
            "OSDetectionAgent_fallback_temperature"
        );
    }

    #[test]
    fn test_qa_pairs() {
        assert_eq!(AgentName::RankAgent.qa_agent(), Some(AgentName::RankAgentQA));
        assert_eq!(AgentName::CmdlineQA.base_agent(), Some(AgentName::CmdlineExtract));
        assert_eq!(AgentName::SigmaAgent.qa_agent(), None);
        assert!(AgentName::HuntQueriesQA.is_qa());
        assert!(!AgentName::OSDetectionFallback.is_qa());
    }

    #[test]
    fn test_parse_roundtrip_and_unknown() {
        for agent in AgentName::ALL {
            assert_eq!(agent.as_str().parse::<AgentName>().unwrap(), agent);
        }
        assert!("CmdLineQA".parse::<AgentName>().is_err());
        assert!(!AgentName::is_canonical("ExtractAgentSettings"));
    }

    #[test]
    fn test_implied_base_name() {
        assert_eq!(implied_base_name("CmdlineQA").as_deref(), Some("CmdlineExtract"));
        assert_eq!(implied_base_name("FooQA").as_deref(), Some("Foo"));
        assert_eq!(implied_base_name("QA"), None);
    }
}
