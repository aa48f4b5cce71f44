//! Encode planning: turning resolved configurations into concrete tasks.
//!
//! The dynamic "try hardware, catch, fall back" control flow lives here as
//! an explicit ordered fallback chain per task, so chain state is
//! inspectable and testable without running any external process.

use crate::capability::CapabilitySet;
use crate::config::ResolvedConfig;
use crate::format::{AccelMode, OutputFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Single-pass vs two-pass execution of one chain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    Single,
    TwoPass,
}

impl PassMode {
    pub fn pass_count(&self) -> u32 {
        match self {
            PassMode::Single => 1,
            PassMode::TwoPass => 2,
        }
    }
}

/// One entry in a task's fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Strategy {
    pub encoder: &'static str,
    pub accel: AccelMode,
    pub pass_mode: PassMode,
}

/// Mutable task execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One requested output format, ready to execute: resolved configuration
/// plus the ordered strategy chain. Tasks share no mutable state, even when
/// two tasks encode the same input.
#[derive(Debug, Clone)]
pub struct EncodeTask {
    pub id: Uuid,
    pub format: OutputFormat,
    pub config: ResolvedConfig,
    pub chain: Vec<Strategy>,
    pub state: TaskState,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

/// Builds the fallback chain for one resolved configuration.
///
/// Hardware leads the chain only when the capability set confirms it, and a
/// hardware entry is always single-pass: a two-pass preference is ignored
/// there but survives on the software fallback entry. The software entry is
/// always planned — a software encoder missing at runtime surfaces as that
/// task's failure, not as a planning hole.
fn strategy_chain(config: &ResolvedConfig, capabilities: &CapabilitySet) -> Vec<Strategy> {
    let codec = config.format.codec();
    let software_pass = if config.two_pass && codec.supports_two_pass() {
        PassMode::TwoPass
    } else {
        PassMode::Single
    };

    let mut chain = Vec::with_capacity(2);
    if capabilities.supports(codec, AccelMode::Hardware) {
        chain.push(Strategy {
            encoder: codec.hardware_encoder(),
            accel: AccelMode::Hardware,
            pass_mode: PassMode::Single,
        });
    }
    chain.push(Strategy {
        encoder: codec.software_encoder(),
        accel: AccelMode::Software,
        pass_mode: software_pass,
    });
    chain
}

/// Produces one task per resolved configuration, preserving caller order.
pub fn plan(
    input_path: &Path,
    output_dir: &Path,
    job_id: &str,
    configs: Vec<ResolvedConfig>,
    capabilities: &CapabilitySet,
) -> Vec<EncodeTask> {
    configs
        .into_iter()
        .map(|config| {
            let chain = strategy_chain(&config, capabilities);
            let filename = format!(
                "{job_id}.{}.{}",
                config.format.name(),
                config.format.container().extension()
            );
            EncodeTask {
                id: Uuid::new_v4(),
                format: config.format,
                output_path: output_dir.join(filename),
                input_path: input_path.to_path_buf(),
                config,
                chain,
                state: TaskState::Pending,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, Overrides};
    use crate::format::Codec;

    fn caps(pairs: &[(Codec, AccelMode)]) -> CapabilitySet {
        let mut set = CapabilitySet::default();
        for (codec, mode) in pairs {
            set.insert(*codec, *mode);
        }
        set
    }

    fn resolved(format: OutputFormat, two_pass: bool) -> ResolvedConfig {
        let overrides = Overrides {
            two_pass: Some(two_pass),
            ..Default::default()
        };
        resolve(format, "medium", &overrides, None).unwrap()
    }

    #[test]
    fn test_hardware_leads_when_available() {
        let capabilities = caps(&[(Codec::Hevc, AccelMode::Hardware)]);
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            vec![resolved(OutputFormat::HevcMp4, false)],
            &capabilities,
        );
        let chain = &tasks[0].chain;
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].accel, AccelMode::Hardware);
        assert_eq!(chain[0].encoder, "hevc_vaapi");
        assert_eq!(chain[1].accel, AccelMode::Software);
    }

    #[test]
    fn test_no_hardware_first_entry_without_capability() {
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            vec![resolved(OutputFormat::HevcMp4, false)],
            &CapabilitySet::default(),
        );
        let chain = &tasks[0].chain;
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].accel, AccelMode::Software);
    }

    #[test]
    fn test_two_pass_only_on_software_entry() {
        let capabilities = caps(&[(Codec::Vp9, AccelMode::Hardware)]);
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            vec![resolved(OutputFormat::Vp9Webm, true)],
            &capabilities,
        );
        let chain = &tasks[0].chain;
        assert_eq!(chain[0].pass_mode, PassMode::Single, "hardware is single-pass only");
        assert_eq!(chain[1].pass_mode, PassMode::TwoPass);
    }

    #[test]
    fn test_caller_order_preserved() {
        let configs = vec![
            resolved(OutputFormat::Av1Webm, false),
            resolved(OutputFormat::HevcMp4, false),
            resolved(OutputFormat::H264Mp4, false),
        ];
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            configs,
            &CapabilitySet::default(),
        );
        let order: Vec<_> = tasks.iter().map(|t| t.format).collect();
        assert_eq!(
            order,
            vec![
                OutputFormat::Av1Webm,
                OutputFormat::HevcMp4,
                OutputFormat::H264Mp4
            ]
        );
    }

    #[test]
    fn test_same_codec_two_containers_independent_tasks() {
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            vec![
                resolved(OutputFormat::Av1Webm, false),
                resolved(OutputFormat::Av1Mp4, false),
            ],
            &CapabilitySet::default(),
        );
        assert_ne!(tasks[0].id, tasks[1].id);
        assert_ne!(tasks[0].output_path, tasks[1].output_path);
        assert_eq!(tasks[0].format.codec(), tasks[1].format.codec());
    }

    #[test]
    fn test_output_filename_layout() {
        let tasks = plan(
            Path::new("in.mkv"),
            Path::new("/out"),
            "abcd1234",
            vec![resolved(OutputFormat::HevcMp4, false)],
            &CapabilitySet::default(),
        );
        assert_eq!(
            tasks[0].output_path,
            Path::new("/out/abcd1234.hevc.mp4")
        );
    }
}
