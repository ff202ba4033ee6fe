//! Generation profile per document kind.

use serde::{Deserialize, Serialize};

use super::DocumentKind;

/// How a document kind should be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationProfile {
    /// Plain single-shot generation
    Standard,
    /// Generation augmented with web search results
    Grounded,
    /// Larger thinking budget, slower model
    DeepReasoning,
}

impl GenerationProfile {
    pub fn is_grounded(&self) -> bool {
        matches!(self, Self::Grounded)
    }

    pub fn is_deep_reasoning(&self) -> bool {
        matches!(self, Self::DeepReasoning)
    }
}

/// Profile for `kind`.
///
/// Exhaustive on purpose: adding a kind without deciding its profile is a
/// compile error.
pub const fn profile_for(kind: DocumentKind) -> GenerationProfile {
    use DocumentKind as K;
    use GenerationProfile as P;

    match kind {
        K::MarketAnalysis
        | K::CompetitiveAnalysis
        | K::TechStack
        | K::GoToMarket
        | K::PricingStrategy => P::Grounded,

        K::Prd | K::Architecture | K::DbSchema | K::ApiSpec | K::SecurityPlan | K::TestCases => {
            P::DeepReasoning
        }

        K::Vision
        | K::BusinessModel
        | K::Personas
        | K::UserStories
        | K::FeaturePrioritization
        | K::UserFlows
        | K::Wireframes
        | K::DesignSystem
        | K::DevRoadmap
        | K::SprintPlan
        | K::CodingStandards
        | K::CiCd
        | K::TestStrategy
        | K::QaChecklist
        | K::DeploymentPlan
        | K::MonitoringPlan
        | K::LaunchChecklist
        | K::MarketingPlan
        | K::SalesPlaybook
        | K::AnalyticsPlan
        | K::GrowthPlan
        | K::SupportPlan
        | K::RiskRegister
        | K::Okrs => P::Standard,
    }
}
