//! Accelerator types

use std::fmt;

use serde::Deserialize;

/// GPU models that can be attached to GKE nodes
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum GpuType {
    /// NVIDIA Tesla K80
    K80,
    /// NVIDIA Tesla P100
    P100,
    /// NVIDIA Tesla V100
    V100,
}

impl GpuType {
    /// Accelerator type name understood by the GCE API
    pub fn internal_name(&self) -> &'static str {
        match self {
            Self::K80 => "nvidia-tesla-k80",
            Self::P100 => "nvidia-tesla-p100",
            Self::V100 => "nvidia-tesla-v100",
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::K80 => write!(f, "k80"),
            Self::P100 => write!(f, "p100"),
            Self::V100 => write!(f, "v100"),
        }
    }
}

/// GPUs requested per node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceleratorSpec {
    /// GPU model
    pub gpu_type: GpuType,
    /// Number of GPUs, always positive
    pub count: u32,
}

impl AcceleratorSpec {
    /// Value of the create command's `--accelerator` flag
    pub fn descriptor(&self) -> String {
        format!(
            "type={},count={}",
            self.gpu_type.internal_name(),
            self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_types_map_to_gce_accelerator_names() {
        assert_eq!(GpuType::K80.internal_name(), "nvidia-tesla-k80");
        assert_eq!(GpuType::P100.internal_name(), "nvidia-tesla-p100");
        assert_eq!(GpuType::V100.internal_name(), "nvidia-tesla-v100");
    }

    #[test]
    fn gpu_types_parse_from_lowercase_names() {
        let gpu: GpuType = serde_yaml::from_str("k80").unwrap();
        assert_eq!(gpu, GpuType::K80);
        assert_eq!(gpu.to_string(), "k80");
        assert!(serde_yaml::from_str::<GpuType>("a100").is_err());
    }

    #[test]
    fn descriptor_encodes_internal_type_and_count() {
        let accel = AcceleratorSpec {
            gpu_type: GpuType::K80,
            count: 2,
        };
        assert_eq!(accel.descriptor(), "type=nvidia-tesla-k80,count=2");
    }
}
