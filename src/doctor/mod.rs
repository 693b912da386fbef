//! Doctor command for environment diagnostics
//!
//! Checks everything a working diagnosis session needs: a config file,
//! an API key, a reachable model endpoint serving the configured
//! models, and outbound network access.

use colored::Colorize;
use reqwest::Client;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::gateway::VisionModelClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Environment diagnostics
pub struct Doctor {
    config: PipelineConfig,
}

impl Doctor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::new();

        checks.push(self.check_config_file());
        checks.push(self.check_api_key());
        checks.push(self.check_api_reachable().await);
        checks.push(self.check_models().await);
        checks.push(self.check_network().await);

        checks
    }

    /// Check 1: Config file on disk
    fn check_config_file(&self) -> HealthCheck {
        let name = "Config File".to_string();

        match PipelineConfig::config_path() {
            Ok(path) if path.exists() => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            Ok(path) => HealthCheck {
                name,
                status: HealthStatus::Warn(format!(
                    "No config file at {}, using defaults",
                    path.display()
                )),
            },
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Warn(format!("Cannot locate config: {}", e)),
            },
        }
    }

    /// Check 2: API key configured
    fn check_api_key(&self) -> HealthCheck {
        let name = "API Key".to_string();

        if self.config.has_api_key() {
            HealthCheck {
                name,
                status: HealthStatus::Pass,
            }
        } else {
            HealthCheck {
                name,
                status: HealthStatus::Fail(format!(
                    "No API key set. Export {} or add it to the config file",
                    crate::config::API_KEY_ENV
                )),
            }
        }
    }

    /// Check 3: Model endpoint reachable
    async fn check_api_reachable(&self) -> HealthCheck {
        let name = "Model API".to_string();

        let client = match VisionModelClient::new(&self.config) {
            Ok(client) => client,
            Err(e) => {
                return HealthCheck {
                    name,
                    status: HealthStatus::Fail(format!("Cannot build API client: {}", e)),
                }
            }
        };

        match client.health_check().await {
            Ok(true) => HealthCheck {
                name,
                status: HealthStatus::Pass,
            },
            Ok(false) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!(
                    "{} answered but rejected the request",
                    self.config.api.base_url
                )),
            },
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!("Cannot reach model API: {}", e)),
            },
        }
    }

    /// Check 4: Configured models available
    async fn check_models(&self) -> HealthCheck {
        let name = "Models Available".to_string();

        let client = match VisionModelClient::new(&self.config) {
            Ok(client) => client,
            Err(e) => {
                return HealthCheck {
                    name,
                    status: HealthStatus::Fail(format!("Cannot build API client: {}", e)),
                }
            }
        };

        match client.list_models().await {
            Ok(models) => {
                let missing: Vec<&str> = [
                    self.config.models.vision.as_str(),
                    self.config.models.text.as_str(),
                ]
                .into_iter()
                .filter(|wanted| !models.iter().any(|m| m == wanted))
                .collect();

                if missing.is_empty() {
                    HealthCheck {
                        name,
                        status: HealthStatus::Pass,
                    }
                } else {
                    HealthCheck {
                        name,
                        status: HealthStatus::Warn(format!(
                            "Configured models not listed by the API: {}",
                            missing.join(", ")
                        )),
                    }
                }
            }
            Err(e) => HealthCheck {
                name,
                status: HealthStatus::Fail(format!("Cannot list models: {}", e)),
            },
        }
    }

    /// Check 5: Network egress
    async fn check_network(&self) -> HealthCheck {
        let name = "Network".to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        let test_urls = vec![
            "https://www.google.com",
            "https://www.cloudflare.com",
        ];

        for url in test_urls {
            if let Ok(response) = client.get(url).send().await {
                if response.status().is_success() {
                    return HealthCheck {
                        name,
                        status: HealthStatus::Pass,
                    };
                }
            }
        }

        HealthCheck {
            name,
            status: HealthStatus::Warn("Cannot reach external networks".to_string()),
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n🔍 PlantDoc Environment Diagnostics\n");
        println!("{:<20} {}", "Check", "Status");
        println!("{}", "=".repeat(50));

        for check in checks {
            let status = match &check.status {
                HealthStatus::Pass => format!("✅ {}", "PASS".green()),
                HealthStatus::Warn(msg) => format!("⚠️  {}: {}", "WARN".yellow(), msg),
                HealthStatus::Fail(msg) => format!("❌ {}: {}", "FAIL".red(), msg),
            };

            println!("{:<20} {}", check.name, status);
        }

        println!();
    }

    /// True when no check failed outright
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.api.key = "gsk_test".to_string();
        config
    }

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("w".to_string()),
            HealthStatus::Warn("w".to_string())
        );
        assert_ne!(
            HealthStatus::Fail("a".to_string()),
            HealthStatus::Fail("b".to_string())
        );
    }

    #[test]
    fn test_api_key_check_passes_when_configured() {
        let doctor = Doctor::new(config_with_key());
        let check = doctor.check_api_key();
        assert_eq!(check.status, HealthStatus::Pass);
    }

    #[test]
    fn test_api_key_check_fails_when_missing() {
        let mut config = PipelineConfig::default();
        config.api.key = String::new();
        let doctor = Doctor::new(config);

        let check = doctor.check_api_key();
        assert!(matches!(check.status, HealthStatus::Fail(_)));
    }

    #[test]
    fn test_overall_status_tolerates_warnings() {
        let checks = vec![
            HealthCheck {
                name: "A".to_string(),
                status: HealthStatus::Pass,
            },
            HealthCheck {
                name: "B".to_string(),
                status: HealthStatus::Warn("advisory".to_string()),
            },
        ];
        assert!(Doctor::overall_status(&checks));
    }

    #[test]
    fn test_overall_status_fails_on_any_fail() {
        let checks = vec![
            HealthCheck {
                name: "A".to_string(),
                status: HealthStatus::Pass,
            },
            HealthCheck {
                name: "B".to_string(),
                status: HealthStatus::Fail("broken".to_string()),
            },
        ];
        assert!(!Doctor::overall_status(&checks));
    }
}
