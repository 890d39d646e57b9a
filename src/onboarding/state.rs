//! The four setup steps and the readiness derived from them.

use serde::{Deserialize, Serialize};

/// The provider setup steps, in the order they must be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Profile,
    Payments,
    Service,
    Availability,
}

impl OnboardingStep {
    /// All steps in priority order.
    pub const ORDER: [OnboardingStep; 4] = [
        OnboardingStep::Profile,
        OnboardingStep::Payments,
        OnboardingStep::Service,
        OnboardingStep::Availability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Payments => "payments",
            Self::Service => "service",
            Self::Availability => "availability",
        }
    }

    /// 1-based position shown in the step header.
    pub fn number(&self) -> u8 {
        match self {
            Self::Profile => 1,
            Self::Payments => 2,
            Self::Service => 3,
            Self::Availability => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Profile => "Profile Information",
            Self::Payments => "Payment Setup",
            Self::Service => "Add Service",
            Self::Availability => "Set Availability",
        }
    }

    /// Human-readable description of what is still missing.
    pub fn requirement(&self) -> &'static str {
        match self {
            Self::Profile => "Complete business profile",
            Self::Payments => "Set up subscription and payments",
            Self::Service => "Create at least one service",
            Self::Availability => "Set up availability schedule",
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OnboardingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown onboarding step: {s}"))
    }
}

/// Which requirements a provider currently satisfies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepFlags {
    pub profile: bool,
    pub payments: bool,
    pub service: bool,
    pub availability: bool,
}

impl StepFlags {
    pub fn is_done(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::Profile => self.profile,
            OnboardingStep::Payments => self.payments,
            OnboardingStep::Service => self.service,
            OnboardingStep::Availability => self.availability,
        }
    }

    /// First unsatisfied step in priority order.
    pub fn first_missing(&self) -> Option<OnboardingStep> {
        OnboardingStep::ORDER
            .into_iter()
            .find(|step| !self.is_done(*step))
    }
}

/// Whether a provider may use the provider area, or which step blocks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Incomplete(OnboardingStep),
    Complete,
}

impl Readiness {
    pub fn from_flags(flags: StepFlags) -> Self {
        match flags.first_missing() {
            Some(step) => Self::Incomplete(step),
            None => Self::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn next_step(&self) -> Option<OnboardingStep> {
        match self {
            Self::Incomplete(step) => Some(*step),
            Self::Complete => None,
        }
    }

    /// Where a provider in this state belongs.
    pub fn home_path(&self) -> String {
        match self {
            Self::Complete => "/provider/dashboard".to_string(),
            Self::Incomplete(step) => format!("/provider/onboarding?step={step}"),
        }
    }
}

/// Result of one readiness evaluation.
///
/// Completeness and next step are always derived from the flags, so the
/// two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ReadinessView")]
pub struct ReadinessReport {
    flags: StepFlags,
    degraded: bool,
}

impl ReadinessReport {
    pub fn from_flags(flags: StepFlags) -> Self {
        Self {
            flags,
            degraded: false,
        }
    }

    /// Conservative report used when provider records could not be read.
    pub fn degraded() -> Self {
        Self {
            flags: StepFlags::default(),
            degraded: true,
        }
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn readiness(&self) -> Readiness {
        Readiness::from_flags(self.flags)
    }

    pub fn is_complete(&self) -> bool {
        self.readiness().is_complete()
    }

    pub fn next_step(&self) -> Option<OnboardingStep> {
        self.readiness().next_step()
    }

    /// The single next requirement, or a generic prompt when degraded.
    pub fn missing_requirements(&self) -> Vec<String> {
        if self.degraded {
            return vec!["Complete setup to get started".to_string()];
        }
        self.next_step()
            .map(|step| vec![step.requirement().to_string()])
            .unwrap_or_default()
    }

    pub fn provider_readiness(&self) -> ProviderReadiness {
        ProviderReadiness {
            is_ready: self.is_complete(),
            missing_profile: !self.flags.profile,
            missing_subscription: !self.flags.payments,
            missing_service: !self.flags.service,
            missing_availability: !self.flags.availability,
        }
    }
}

/// Wire shape of a `ReadinessReport`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessView {
    is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_step: Option<OnboardingStep>,
    current_steps: StepFlags,
    missing_requirements: Vec<String>,
}

impl From<ReadinessReport> for ReadinessView {
    fn from(report: ReadinessReport) -> Self {
        Self {
            is_complete: report.is_complete(),
            next_step: report.next_step(),
            current_steps: report.flags,
            missing_requirements: report.missing_requirements(),
        }
    }
}

/// Dashboard summary of what a provider still lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReadiness {
    pub is_ready: bool,
    pub missing_profile: bool,
    pub missing_subscription: bool,
    pub missing_service: bool,
    pub missing_availability: bool,
}
