//! Hierarchy registry data.
//!
//! `NODES` is indexed by `DocumentKind as usize`, so the declaration order of
//! the enum and of the table must agree. The unit tests pin that down.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of one planning document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Vision,
    MarketAnalysis,
    CompetitiveAnalysis,
    BusinessModel,
    Personas,
    Prd,
    UserStories,
    FeaturePrioritization,
    UserFlows,
    Wireframes,
    DesignSystem,
    Architecture,
    TechStack,
    DbSchema,
    ApiSpec,
    SecurityPlan,
    DevRoadmap,
    SprintPlan,
    CodingStandards,
    CiCd,
    TestStrategy,
    TestCases,
    QaChecklist,
    DeploymentPlan,
    MonitoringPlan,
    LaunchChecklist,
    GoToMarket,
    PricingStrategy,
    MarketingPlan,
    SalesPlaybook,
    AnalyticsPlan,
    GrowthPlan,
    SupportPlan,
    RiskRegister,
    Okrs,
}

impl DocumentKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 35] = [
        Self::Vision,
        Self::MarketAnalysis,
        Self::CompetitiveAnalysis,
        Self::BusinessModel,
        Self::Personas,
        Self::Prd,
        Self::UserStories,
        Self::FeaturePrioritization,
        Self::UserFlows,
        Self::Wireframes,
        Self::DesignSystem,
        Self::Architecture,
        Self::TechStack,
        Self::DbSchema,
        Self::ApiSpec,
        Self::SecurityPlan,
        Self::DevRoadmap,
        Self::SprintPlan,
        Self::CodingStandards,
        Self::CiCd,
        Self::TestStrategy,
        Self::TestCases,
        Self::QaChecklist,
        Self::DeploymentPlan,
        Self::MonitoringPlan,
        Self::LaunchChecklist,
        Self::GoToMarket,
        Self::PricingStrategy,
        Self::MarketingPlan,
        Self::SalesPlaybook,
        Self::AnalyticsPlan,
        Self::GrowthPlan,
        Self::SupportPlan,
        Self::RiskRegister,
        Self::Okrs,
    ];

    /// Stable kebab-case slug used in ids, file names and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::MarketAnalysis => "market-analysis",
            Self::CompetitiveAnalysis => "competitive-analysis",
            Self::BusinessModel => "business-model",
            Self::Personas => "personas",
            Self::Prd => "prd",
            Self::UserStories => "user-stories",
            Self::FeaturePrioritization => "feature-prioritization",
            Self::UserFlows => "user-flows",
            Self::Wireframes => "wireframes",
            Self::DesignSystem => "design-system",
            Self::Architecture => "architecture",
            Self::TechStack => "tech-stack",
            Self::DbSchema => "db-schema",
            Self::ApiSpec => "api-spec",
            Self::SecurityPlan => "security-plan",
            Self::DevRoadmap => "dev-roadmap",
            Self::SprintPlan => "sprint-plan",
            Self::CodingStandards => "coding-standards",
            Self::CiCd => "ci-cd",
            Self::TestStrategy => "test-strategy",
            Self::TestCases => "test-cases",
            Self::QaChecklist => "qa-checklist",
            Self::DeploymentPlan => "deployment-plan",
            Self::MonitoringPlan => "monitoring-plan",
            Self::LaunchChecklist => "launch-checklist",
            Self::GoToMarket => "go-to-market",
            Self::PricingStrategy => "pricing-strategy",
            Self::MarketingPlan => "marketing-plan",
            Self::SalesPlaybook => "sales-playbook",
            Self::AnalyticsPlan => "analytics-plan",
            Self::GrowthPlan => "growth-plan",
            Self::SupportPlan => "support-plan",
            Self::RiskRegister => "risk-register",
            Self::Okrs => "okrs",
        }
    }

    /// Registry entry for this kind.
    pub fn node(&self) -> &'static HierarchyNode {
        lookup(*self)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("unknown document kind: {s}"))
    }
}

/// Project phase a document belongs to. Variants are declared in phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    VisionStrategy,
    ProductDefinition,
    ExperienceDesign,
    Architecture,
    EngineeringPlan,
    Quality,
    Launch,
    GoToMarket,
    GrowthOperations,
}

impl Category {
    /// Every category, in phase order.
    pub const ALL: [Self; 9] = [
        Self::VisionStrategy,
        Self::ProductDefinition,
        Self::ExperienceDesign,
        Self::Architecture,
        Self::EngineeringPlan,
        Self::Quality,
        Self::Launch,
        Self::GoToMarket,
        Self::GrowthOperations,
    ];

    /// Human-readable phase name.
    pub fn title(&self) -> &'static str {
        match self {
            Self::VisionStrategy => "Vision & Strategy",
            Self::ProductDefinition => "Product Definition",
            Self::ExperienceDesign => "Experience Design",
            Self::Architecture => "Architecture",
            Self::EngineeringPlan => "Engineering Plan",
            Self::Quality => "Quality",
            Self::Launch => "Launch",
            Self::GoToMarket => "Go-To-Market",
            Self::GrowthOperations => "Growth & Operations",
        }
    }

    /// Zero-based position in the phase order.
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Static metadata for one document kind.
#[derive(Debug, PartialEq, Eq)]
pub struct HierarchyNode {
    pub kind: DocumentKind,
    pub title: &'static str,
    pub category: Category,
    /// Role label of the author persona
    pub owner: &'static str,
    /// Label for the action that moves on from this document
    pub cta_label: &'static str,
    pub description: &'static str,
    /// Focus areas handed to the generator
    pub hints: &'static str,
    /// Kinds this document unlocks; the first entry is the primary successor
    pub unlocks: &'static [DocumentKind],
}

use Category as C;
use DocumentKind as K;

static NODES: [HierarchyNode; 35] = [
    HierarchyNode {
        kind: K::Vision,
        title: "Product Vision",
        category: C::VisionStrategy,
        owner: "Product Strategist",
        cta_label: "Analyze the market",
        description: "Why the product exists, who it serves and what success looks like.",
        hints: "vision statement, mission, core value proposition, north-star metric, guiding principles",
        unlocks: &[K::MarketAnalysis, K::Personas],
    },
    HierarchyNode {
        kind: K::MarketAnalysis,
        title: "Market Analysis",
        category: C::VisionStrategy,
        owner: "Market Analyst",
        cta_label: "Map the competition",
        description: "Market size, segments, trends and demand signals.",
        hints: "TAM/SAM/SOM, segments, trends, demand drivers, regulatory factors",
        unlocks: &[K::CompetitiveAnalysis, K::PricingStrategy],
    },
    HierarchyNode {
        kind: K::CompetitiveAnalysis,
        title: "Competitive Analysis",
        category: C::VisionStrategy,
        owner: "Market Analyst",
        cta_label: "Define the business model",
        description: "Direct and indirect competitors, positioning and gaps.",
        hints: "competitor matrix, strengths and weaknesses, differentiation, positioning map",
        unlocks: &[K::BusinessModel, K::GoToMarket],
    },
    HierarchyNode {
        kind: K::BusinessModel,
        title: "Business Model",
        category: C::VisionStrategy,
        owner: "Product Strategist",
        cta_label: "Describe the users",
        description: "How the product creates, delivers and captures value.",
        hints: "business model canvas, revenue streams, cost structure, key partners, unit economics",
        unlocks: &[K::Personas, K::PricingStrategy],
    },
    HierarchyNode {
        kind: K::Personas,
        title: "User Personas",
        category: C::ProductDefinition,
        owner: "UX Researcher",
        cta_label: "Write the PRD",
        description: "Archetypal users with goals, frustrations and context.",
        hints: "3-5 personas, goals, pain points, behaviours, jobs to be done",
        unlocks: &[K::Prd, K::UserFlows],
    },
    HierarchyNode {
        kind: K::Prd,
        title: "Product Requirements Document",
        category: C::ProductDefinition,
        owner: "Product Manager",
        cta_label: "Break down user stories",
        description: "Functional and non-functional requirements for the first release.",
        hints: "scope, functional requirements, non-functional requirements, assumptions, out of scope, success metrics",
        unlocks: &[K::UserStories, K::Architecture],
    },
    HierarchyNode {
        kind: K::UserStories,
        title: "User Stories",
        category: C::ProductDefinition,
        owner: "Product Manager",
        cta_label: "Prioritize features",
        description: "Stories with acceptance criteria grouped by epic.",
        hints: "epics, stories in As a/I want/So that form, acceptance criteria, estimates",
        unlocks: &[K::FeaturePrioritization, K::TestCases],
    },
    HierarchyNode {
        kind: K::FeaturePrioritization,
        title: "Feature Prioritization",
        category: C::ProductDefinition,
        owner: "Product Manager",
        cta_label: "Design user flows",
        description: "What ships first and why.",
        hints: "MoSCoW or RICE scoring, MVP cut line, dependencies, release slices",
        unlocks: &[K::UserFlows, K::DevRoadmap],
    },
    HierarchyNode {
        kind: K::UserFlows,
        title: "User Flows",
        category: C::ExperienceDesign,
        owner: "UX Designer",
        cta_label: "Sketch wireframes",
        description: "Step-by-step journeys through the product.",
        hints: "primary flows, entry points, decision branches, error states, mermaid diagrams",
        unlocks: &[K::Wireframes],
    },
    HierarchyNode {
        kind: K::Wireframes,
        title: "Wireframes",
        category: C::ExperienceDesign,
        owner: "UX Designer",
        cta_label: "Build the design system",
        description: "Screen-level layout descriptions for key views.",
        hints: "screen inventory, layout per screen, components used, responsive notes",
        unlocks: &[K::DesignSystem],
    },
    HierarchyNode {
        kind: K::DesignSystem,
        title: "Design System",
        category: C::ExperienceDesign,
        owner: "UI Designer",
        cta_label: "Plan the architecture",
        description: "Tokens, components and interaction patterns.",
        hints: "colour and type tokens, spacing scale, component catalogue, accessibility rules",
        unlocks: &[K::Architecture],
    },
    HierarchyNode {
        kind: K::Architecture,
        title: "System Architecture",
        category: C::Architecture,
        owner: "Solution Architect",
        cta_label: "Choose the tech stack",
        description: "Components, boundaries, data flow and deployment topology.",
        hints: "context and container diagrams, component responsibilities, data flow, scalability, trade-offs",
        unlocks: &[K::TechStack, K::SecurityPlan],
    },
    HierarchyNode {
        kind: K::TechStack,
        title: "Technology Stack",
        category: C::Architecture,
        owner: "Solution Architect",
        cta_label: "Model the database",
        description: "Languages, frameworks, services and the reasons for each.",
        hints: "frontend, backend, data, infrastructure, third-party services, rationale, alternatives",
        unlocks: &[K::DbSchema, K::CiCd],
    },
    HierarchyNode {
        kind: K::DbSchema,
        title: "Database Schema",
        category: C::Architecture,
        owner: "Data Engineer",
        cta_label: "Specify the API",
        description: "Entities, relations, indexes and migrations.",
        hints: "ER diagram, table definitions, keys, indexes, constraints, migration strategy",
        unlocks: &[K::ApiSpec],
    },
    HierarchyNode {
        kind: K::ApiSpec,
        title: "API Specification",
        category: C::Architecture,
        owner: "Backend Lead",
        cta_label: "Plan security",
        description: "Endpoints, payloads, errors and versioning.",
        hints: "resources, endpoints, request and response schemas, error model, auth, pagination",
        unlocks: &[K::SecurityPlan, K::TestCases],
    },
    HierarchyNode {
        kind: K::SecurityPlan,
        title: "Security Plan",
        category: C::Architecture,
        owner: "Security Engineer",
        cta_label: "Draft the roadmap",
        description: "Threat model and controls.",
        hints: "STRIDE threat model, authn/authz, data protection, secrets, compliance, incident response",
        unlocks: &[K::DevRoadmap, K::RiskRegister],
    },
    HierarchyNode {
        kind: K::DevRoadmap,
        title: "Development Roadmap",
        category: C::EngineeringPlan,
        owner: "Engineering Lead",
        cta_label: "Plan the sprints",
        description: "Milestones from first commit to launch.",
        hints: "phases, milestones, deliverables, team allocation, critical path",
        unlocks: &[K::SprintPlan],
    },
    HierarchyNode {
        kind: K::SprintPlan,
        title: "Sprint Plan",
        category: C::EngineeringPlan,
        owner: "Scrum Master",
        cta_label: "Set coding standards",
        description: "The first sprints broken into tasks.",
        hints: "sprint goals, backlog items, capacity, definition of done, ceremonies",
        unlocks: &[K::CodingStandards],
    },
    HierarchyNode {
        kind: K::CodingStandards,
        title: "Coding Standards",
        category: C::EngineeringPlan,
        owner: "Engineering Lead",
        cta_label: "Design the pipeline",
        description: "Conventions every contributor follows.",
        hints: "style guides, branching model, review rules, documentation, error handling",
        unlocks: &[K::CiCd],
    },
    HierarchyNode {
        kind: K::CiCd,
        title: "CI/CD Pipeline",
        category: C::EngineeringPlan,
        owner: "DevOps Engineer",
        cta_label: "Define the test strategy",
        description: "Build, test and release automation.",
        hints: "pipeline stages, environments, artifact flow, quality gates, rollback",
        unlocks: &[K::TestStrategy, K::DeploymentPlan],
    },
    HierarchyNode {
        kind: K::TestStrategy,
        title: "Test Strategy",
        category: C::Quality,
        owner: "QA Lead",
        cta_label: "Write test cases",
        description: "What is tested, how, and by whom.",
        hints: "test pyramid, tooling, environments, coverage goals, entry and exit criteria",
        unlocks: &[K::TestCases],
    },
    HierarchyNode {
        kind: K::TestCases,
        title: "Test Cases",
        category: C::Quality,
        owner: "QA Engineer",
        cta_label: "Build the QA checklist",
        description: "Concrete cases traced to user stories.",
        hints: "case id, preconditions, steps, expected result, priority, traceability to stories",
        unlocks: &[K::QaChecklist],
    },
    HierarchyNode {
        kind: K::QaChecklist,
        title: "QA Checklist",
        category: C::Quality,
        owner: "QA Lead",
        cta_label: "Plan the deployment",
        description: "Release-readiness checks.",
        hints: "functional, accessibility, performance, security and compatibility checks",
        unlocks: &[K::DeploymentPlan],
    },
    HierarchyNode {
        kind: K::DeploymentPlan,
        title: "Deployment Plan",
        category: C::Launch,
        owner: "DevOps Engineer",
        cta_label: "Plan monitoring",
        description: "How the product reaches production.",
        hints: "infrastructure, environments, release strategy, migrations, rollback plan",
        unlocks: &[K::MonitoringPlan],
    },
    HierarchyNode {
        kind: K::MonitoringPlan,
        title: "Monitoring Plan",
        category: C::Launch,
        owner: "Site Reliability Engineer",
        cta_label: "Prepare the launch",
        description: "Signals, alerts and on-call.",
        hints: "SLIs and SLOs, metrics, logs, traces, alert rules, on-call rotation",
        unlocks: &[K::LaunchChecklist],
    },
    HierarchyNode {
        kind: K::LaunchChecklist,
        title: "Launch Checklist",
        category: C::Launch,
        owner: "Product Manager",
        cta_label: "Plan go-to-market",
        description: "Everything that must be true on launch day.",
        hints: "pre-launch, launch day and post-launch tasks, owners, go/no-go criteria",
        unlocks: &[K::GoToMarket],
    },
    HierarchyNode {
        kind: K::GoToMarket,
        title: "Go-To-Market Strategy",
        category: C::GoToMarket,
        owner: "Marketing Lead",
        cta_label: "Set pricing",
        description: "How the product reaches and wins its first customers.",
        hints: "ideal customer profile, channels, messaging, launch sequence, partnerships",
        unlocks: &[K::PricingStrategy, K::MarketingPlan],
    },
    HierarchyNode {
        kind: K::PricingStrategy,
        title: "Pricing Strategy",
        category: C::GoToMarket,
        owner: "Product Strategist",
        cta_label: "Write the marketing plan",
        description: "Packaging, price points and monetisation experiments.",
        hints: "pricing model, tiers, competitor benchmarks, willingness to pay, discounts",
        unlocks: &[K::MarketingPlan],
    },
    HierarchyNode {
        kind: K::MarketingPlan,
        title: "Marketing Plan",
        category: C::GoToMarket,
        owner: "Marketing Lead",
        cta_label: "Build the sales playbook",
        description: "Campaigns, content and budget.",
        hints: "objectives, campaigns, content calendar, channels, budget, KPIs",
        unlocks: &[K::SalesPlaybook],
    },
    HierarchyNode {
        kind: K::SalesPlaybook,
        title: "Sales Playbook",
        category: C::GoToMarket,
        owner: "Sales Lead",
        cta_label: "Plan analytics",
        description: "How deals are found, qualified and closed.",
        hints: "sales process, qualification, objection handling, scripts, tooling",
        unlocks: &[K::AnalyticsPlan],
    },
    HierarchyNode {
        kind: K::AnalyticsPlan,
        title: "Analytics Plan",
        category: C::GrowthOperations,
        owner: "Data Analyst",
        cta_label: "Plan growth",
        description: "Events, funnels and dashboards.",
        hints: "tracking plan, event taxonomy, funnels, dashboards, privacy",
        unlocks: &[K::GrowthPlan],
    },
    HierarchyNode {
        kind: K::GrowthPlan,
        title: "Growth Plan",
        category: C::GrowthOperations,
        owner: "Growth Lead",
        cta_label: "Plan customer support",
        description: "Acquisition, activation, retention and referral loops.",
        hints: "AARRR funnel, growth loops, experiment backlog, retention levers",
        unlocks: &[K::SupportPlan],
    },
    HierarchyNode {
        kind: K::SupportPlan,
        title: "Customer Support Plan",
        category: C::GrowthOperations,
        owner: "Support Lead",
        cta_label: "Register the risks",
        description: "Channels, SLAs and knowledge base.",
        hints: "support channels, tiers, SLAs, escalation, knowledge base, feedback loop",
        unlocks: &[K::RiskRegister],
    },
    HierarchyNode {
        kind: K::RiskRegister,
        title: "Risk Register",
        category: C::GrowthOperations,
        owner: "Program Manager",
        cta_label: "Set OKRs",
        description: "Known risks with likelihood, impact and mitigation.",
        hints: "risk id, description, likelihood, impact, owner, mitigation, contingency",
        unlocks: &[K::Okrs],
    },
    HierarchyNode {
        kind: K::Okrs,
        title: "OKRs",
        category: C::GrowthOperations,
        owner: "Product Strategist",
        cta_label: "Review the plan",
        description: "Objectives and key results for the first quarters.",
        hints: "objectives, measurable key results, owners, cadence, alignment to vision",
        unlocks: &[],
    },
];

/// Registry entry for `kind`. Total over every variant.
pub fn lookup(kind: DocumentKind) -> &'static HierarchyNode {
    let node = &NODES[kind as usize];
    debug_assert_eq!(node.kind, kind, "hierarchy table out of order");
    node
}

/// Every kind in declaration order.
pub fn all_kinds() -> &'static [DocumentKind] {
    &DocumentKind::ALL
}

/// Kinds unlocked by `kind`, primary successor first.
pub fn unlocks_of(kind: DocumentKind) -> &'static [DocumentKind] {
    lookup(kind).unlocks
}

/// Kinds whose unlock lists contain `kind`, in declaration order.
pub fn prerequisites_of(kind: DocumentKind) -> impl Iterator<Item = DocumentKind> {
    NODES.iter().filter(move |node| node.unlocks.contains(&kind)).map(|node| node.kind)
}

/// Every kind belonging to the first `categories` categories.
pub fn leading_kinds(categories: usize) -> Vec<DocumentKind> {
    all_kinds()
        .iter()
        .copied()
        .filter(|kind| lookup(*kind).category.position() < categories)
        .collect()
}

/// Registry entries of one category, in declaration order.
pub fn nodes_in(category: Category) -> impl Iterator<Item = &'static HierarchyNode> {
    NODES.iter().filter(move |node| node.category == category)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_table_matches_declaration_order() {
        for (index, kind) in DocumentKind::ALL.iter().enumerate() {
            assert_eq!(NODES[index].kind, *kind);
            assert_eq!(*kind as usize, index);
        }
    }

    #[test]
    fn test_lookup_is_total() {
        for kind in all_kinds() {
            let node = lookup(*kind);
            assert_eq!(node.kind, *kind);
            assert!(!node.title.is_empty());
            assert!(!node.owner.is_empty());
        }
    }

    #[test]
    fn test_all_kinds_unique_and_stable() {
        let first: Vec<_> = all_kinds().to_vec();
        let second: Vec<_> = all_kinds().to_vec();
        assert_eq!(first, second);

        let unique: HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
        assert_eq!(first.len(), 35);
    }

    #[test]
    fn test_unlocks_point_forward() {
        for kind in all_kinds() {
            for next in unlocks_of(*kind) {
                assert!(next > kind, "{kind} unlocks earlier kind {next}");
            }
        }
    }

    #[test]
    fn test_categories_are_contiguous_and_ordered() {
        let mut last = Category::VisionStrategy;
        for kind in all_kinds() {
            let category = lookup(*kind).category;
            assert!(category >= last, "{kind} breaks category order");
            last = category;
        }
        for category in Category::ALL {
            assert!(nodes_in(category).count() > 0, "{category} has no documents");
        }
    }

    #[test]
    fn test_every_kind_but_last_has_a_successor() {
        let (last, rest) = all_kinds().split_last().unwrap();
        assert!(unlocks_of(*last).is_empty());
        for (kind, next) in rest.iter().zip(&all_kinds()[1..]) {
            assert_eq!(unlocks_of(*kind).first(), Some(next), "{kind} must unlock {next} first");
        }
    }

    #[test]
    fn test_prerequisites_mirror_unlocks() {
        assert_eq!(prerequisites_of(DocumentKind::Vision).count(), 0);
        assert!(prerequisites_of(DocumentKind::MarketAnalysis).any(|k| k == DocumentKind::Vision));
        for kind in all_kinds() {
            for prerequisite in prerequisites_of(*kind) {
                assert!(unlocks_of(prerequisite).contains(kind));
            }
        }
    }

    #[test]
    fn test_leading_kinds_cover_first_categories() {
        let kinds = leading_kinds(2);
        assert_eq!(kinds.len(), 8);
        assert_eq!(kinds.first(), Some(&DocumentKind::Vision));
        assert_eq!(kinds.last(), Some(&DocumentKind::FeaturePrioritization));
        assert!(leading_kinds(0).is_empty());
        assert_eq!(leading_kinds(Category::ALL.len()).len(), 35);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("db-schema".parse::<DocumentKind>().unwrap(), DocumentKind::DbSchema);
        assert_eq!("GO_TO_MARKET".parse::<DocumentKind>().unwrap(), DocumentKind::GoToMarket);
        assert!("roadmap".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_kind_serde_uses_slug() {
        let json = serde_json::to_string(&DocumentKind::CiCd).unwrap();
        assert_eq!(json, "\"ci-cd\"");
        for kind in all_kinds() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }
}
