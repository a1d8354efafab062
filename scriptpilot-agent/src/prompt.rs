//! # System prompt
//!
//! The instructions seeded at the top of every transcript. They tell the
//! model how to answer (a fenced Python script or plain prose), how script
//! output comes back, and how to ask for another turn with `CONTINUE`.

use crate::CONTINUE_MARKER;

/// Host facts the model needs to write scripts that work here.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
    pub cwd: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| ".".to_string()),
        }
    }
}

/// A short worked exchange shown to the model.
#[derive(Debug, Clone)]
pub struct Example {
    pub request: &'static str,
    pub reply: &'static str,
}

#[derive(Debug, Clone)]
pub struct SystemPrompt {
    host: HostInfo,
    guidelines: Vec<&'static str>,
    examples: Vec<Example>,
}

impl SystemPrompt {
    pub fn new(host: HostInfo) -> Self {
        Self {
            host,
            guidelines: Self::define_guidelines(),
            examples: Self::define_examples(),
        }
    }

    fn define_guidelines() -> Vec<&'static str> {
        vec![
            "When the request needs an action on this machine, reply with one Python 3 script \
             in a ```python fenced block. It runs right away in a fresh interpreter.",
            "Text outside the fence is shown to the user. Keep it short.",
            "When no action is needed, reply with plain text and no fence.",
            "Everything the script prints to stdout is sent back to you as \
             LAST SCRIPT OUTPUT. Uncaught exceptions come back as an Error message.",
            "If you need to see the output before finishing, make the last line the \
             script prints be CONTINUE. You will get another turn without new user input.",
            "Only print CONTINUE when you really need another turn, or the loop never ends.",
            "Prefer the standard library. If a package is missing, tell the user how to install it.",
            "Never run destructive commands unless the user asked for them explicitly.",
        ]
    }

    fn define_examples() -> Vec<Example> {
        vec![
            Example {
                request: "How many files are in my Downloads folder?",
                reply: "```python\nimport os\n\
                        path = os.path.expanduser('~/Downloads')\n\
                        print(len(os.listdir(path)))\n```",
            },
            Example {
                request: "Summarize the README in this directory.",
                reply: "```python\nwith open('README.md') as f:\n    print(f.read())\n\
                        print('CONTINUE')\n```",
            },
            Example {
                request: "What does HTTP 418 mean?",
                reply: "418 is \"I'm a teapot\", an April Fools' status code from RFC 2324.",
            },
        ]
    }

    pub fn to_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are a command-line assistant that gets things done by writing Python \
             scripts that run on the user's machine.\n\n## Rules\n",
        );
        for guideline in &self.guidelines {
            prompt.push_str("- ");
            prompt.push_str(guideline);
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "\n## Host\n- os: {}\n- arch: {}\n- working directory: {}\n",
            self.host.os, self.host.arch, self.host.cwd
        ));

        prompt.push_str("\n## Examples\n");
        for example in &self.examples {
            prompt.push_str(&format!("\nUser: {}\nAssistant:\n{}\n", example.request, example.reply));
        }

        debug_assert!(prompt.contains(CONTINUE_MARKER));
        prompt
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new(HostInfo::detect())
    }
}
