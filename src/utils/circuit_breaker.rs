use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use anyhow::Result;
use log::{warn, info};

pub const PUSH_SERVICE: &str = "pushbullet";
pub const PRAYER_TIMES_SERVICE: &str = "prayer_times";

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            }),
        }
    }

    pub async fn execute<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut inner = self.inner.write().await;
            if inner.state == CircuitState::Open {
                let cooled_down = inner
                    .last_failure_time
                    .map_or(false, |failed_at| failed_at.elapsed() > self.config.timeout);
                if !cooled_down {
                    return Err(anyhow::anyhow!("Circuit breaker is open"));
                }
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                info!("Circuit breaker transitioning to half-open after timeout");
            }
        }

        let result = operation().await;

        match &result {
            Ok(_) => self.on_success().await,
            Err(_) => self.on_failure().await,
        }

        result
    }

    async fn on_success(&self) {
        let mut inner = self.inner.write().await;

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    info!("Circuit breaker closing after {} successful calls", inner.success_count);
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
            }
        }
    }

    async fn on_failure(&self) {
        let mut inner = self.inner.write().await;

        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                // a failed probe reopens immediately
                inner.state = CircuitState::Open;
                warn!("Circuit breaker reopening after failed half-open call");
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!("Circuit breaker opening after {} failures", inner.failure_count);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    pub async fn get_stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.read().await;
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<Instant>,
}

// Global circuit breaker registry for the external services
pub struct CircuitBreakerRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_breaker(&self, service_name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.write().await;

        breakers
            .entry(service_name.to_string())
            .or_insert_with(|| {
                let config = match service_name {
                    PUSH_SERVICE => CircuitBreakerConfig {
                        failure_threshold: 3,
                        success_threshold: 1,
                        timeout: Duration::from_secs(120),
                    },
                    PRAYER_TIMES_SERVICE => CircuitBreakerConfig {
                        failure_threshold: 5,
                        success_threshold: 1,
                        timeout: Duration::from_secs(60),
                    },
                    _ => CircuitBreakerConfig::default(),
                };
                info!("Created circuit breaker for service: {}", service_name);
                Arc::new(CircuitBreaker::new(config))
            })
            .clone()
    }

    pub async fn get_all_stats(&self) -> HashMap<String, CircuitBreakerStats> {
        let breakers = self.breakers.read().await;
        let mut stats = HashMap::new();

        for (service_name, breaker) in breakers.iter() {
            stats.insert(service_name.clone(), breaker.get_stats().await);
        }

        stats
    }
}

// Global instance
lazy_static::lazy_static! {
    pub static ref CIRCUIT_BREAKER_REGISTRY: CircuitBreakerRegistry = CircuitBreakerRegistry::new();
}

pub async fn get_circuit_breaker(service_name: &str) -> Arc<CircuitBreaker> {
    CIRCUIT_BREAKER_REGISTRY.get_breaker(service_name).await
}

pub async fn get_all_circuit_breaker_stats() -> HashMap<String, CircuitBreakerStats> {
    CIRCUIT_BREAKER_REGISTRY.get_all_stats().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_circuit_breaker_opens_on_failures() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(100),
        };

        let breaker = CircuitBreaker::new(config);

        // First failure
        let result: Result<&str, _> = breaker.execute(|| async {
            Err(anyhow::anyhow!("Test failure"))
        }).await;
        assert!(result.is_err());
        assert_eq!(breaker.get_state().await, CircuitState::Closed);

        // Second failure should open circuit
        let result: Result<&str, _> = breaker.execute(|| async {
            Err(anyhow::anyhow!("Test failure"))
        }).await;
        assert!(result.is_err());
        assert_eq!(breaker.get_state().await, CircuitState::Open);

        // Third call should fail immediately
        let result: Result<&str, _> = breaker.execute(|| async {
            Ok("success")
        }).await;
        assert!(result.is_err());
        assert_eq!(breaker.get_state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_circuit_breaker_half_open_state() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(50),
        };

        let breaker = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _: Result<&str, _> = breaker.execute(|| async {
                Err(anyhow::anyhow!("Test failure"))
            }).await;
        }

        assert_eq!(breaker.get_state().await, CircuitState::Open);

        sleep(Duration::from_millis(60)).await;

        // Next call should go to half-open and succeed
        let result = breaker.execute(|| async {
            Ok("success")
        }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.get_state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_reopens() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            timeout: Duration::from_millis(20),
        });

        let _: Result<(), _> = breaker.execute(|| async { Err(anyhow::anyhow!("down")) }).await;
        sleep(Duration::from_millis(30)).await;
        let _: Result<(), _> = breaker.execute(|| async { Err(anyhow::anyhow!("still down")) }).await;

        assert_eq!(breaker.get_state().await, CircuitState::Open);
        assert_eq!(breaker.get_stats().await.failure_count, 2);
    }

    #[tokio::test]
    async fn test_registry_reuses_breakers() {
        let registry = CircuitBreakerRegistry::new();
        let first = registry.get_breaker(PUSH_SERVICE).await;
        let second = registry.get_breaker(PUSH_SERVICE).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.get_all_stats().await.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_stats_cover_registered_services() {
        let breaker = get_circuit_breaker("registry-stats-test").await;
        let _ = breaker.execute(|| async { Err::<(), _>(anyhow::anyhow!("down")) }).await;

        let stats = get_all_circuit_breaker_stats().await;
        let entry = stats.get("registry-stats-test").expect("registered service has stats");
        assert_eq!(entry.failure_count, 1);
        assert_eq!(entry.state, CircuitState::Closed);
    }
}
