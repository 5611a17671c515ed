use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four strings that seed every generation request of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParams {
    pub company_name: String,
    pub startup_type: String,
    pub location: String,
    pub team_info: String,
}

/// A required setup field was left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("公司名称不能为空")]
    MissingCompanyName,
    #[error("请选择一个创业类型")]
    MissingStartupType,
    #[error("创业地点不能为空")]
    MissingLocation,
    #[error("团队信息不能为空")]
    MissingTeamInfo,
}

impl SetupError {
    /// Short headline shown above the error description.
    pub fn title(&self) -> &'static str {
        match self {
            SetupError::MissingCompanyName => "请输入公司名称",
            SetupError::MissingStartupType => "请选择创业类型",
            SetupError::MissingLocation => "请输入创业地点",
            SetupError::MissingTeamInfo => "请输入团队信息",
        }
    }
}

impl ScenarioParams {
    pub fn new(
        company_name: impl Into<String>,
        startup_type: impl Into<String>,
        location: impl Into<String>,
        team_info: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            startup_type: startup_type.into(),
            location: location.into(),
            team_info: team_info.into(),
        }
    }

    /// Checks the fields in form order; the first blank one is reported.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.company_name.trim().is_empty() {
            return Err(SetupError::MissingCompanyName);
        }
        if self.startup_type.trim().is_empty() {
            return Err(SetupError::MissingStartupType);
        }
        if self.location.trim().is_empty() {
            return Err(SetupError::MissingLocation);
        }
        if self.team_info.trim().is_empty() {
            return Err(SetupError::MissingTeamInfo);
        }
        Ok(())
    }

    /// A session counts as started once a company name is present.
    pub fn is_started(&self) -> bool {
        !self.company_name.is_empty()
    }
}
