//! Health reporting for resource pools

/// Health status of a resource pool
///
/// # Examples
///
/// ```
/// use esox_browserpool::HealthStatus;
///
/// let health = HealthStatus::new(2, 1, 3, 4, 0, false);
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_resources, 2);
///
/// let saturated = HealthStatus::new(0, 4, 4, 4, 2, false);
/// assert!(!saturated.is_healthy());
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    /// Idle resources count
    pub idle_resources: usize,

    /// Checked-out resources count
    pub in_use_resources: usize,

    /// Live resources count
    pub total_resources: usize,

    /// Maximum pool size
    pub max_size: usize,

    /// Callers waiting for a resource
    pub waiting: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(
        idle: usize,
        in_use: usize,
        total: usize,
        max_size: usize,
        waiting: usize,
        closed: bool,
    ) -> Self {
        let utilization = if max_size > 0 {
            in_use as f64 / max_size as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if closed {
            warnings.push("Pool is closed".to_string());
            is_healthy = false;
        }

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if waiting > 0 {
            warnings.push(format!("{} callers waiting for a resource", waiting));
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            idle_resources: idle,
            in_use_resources: in_use,
            total_resources: total,
            max_size,
            waiting,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
