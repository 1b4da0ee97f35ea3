//! A [`CommandRunner`] that answers from a script so the harness can be exercised without a
//! cluster.

use crate::oc::{CommandOutput, CommandRunner};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Script {
    responses: Vec<(String, VecDeque<CommandOutput>)>,
    calls: Vec<String>,
}

/// Each scripted pattern is matched against the space-joined argument vector. The first pattern
/// contained in it answers with the next queued output; the last output of a queue repeats.
/// Commands that match nothing fail.
#[derive(Debug, Default, Clone)]
pub(crate) struct ScriptedRunner {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    pub(crate) fn respond(&self, pattern: &str, outputs: Vec<CommandOutput>) {
        self.script
            .lock()
            .unwrap()
            .responses
            .push((pattern.to_string(), outputs.into()));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput> {
        let joined = args.join(" ");
        let mut script = self.script.lock().unwrap();
        script.calls.push(joined.clone());
        let queue = script
            .responses
            .iter_mut()
            .find(|(pattern, _)| joined.contains(pattern.as_str()))
            .map(|(_, queue)| queue);
        Ok(match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => CommandOutput::failure(format!("no scripted response for '{}'", joined)),
        })
    }
}
