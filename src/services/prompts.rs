//! Backend prompt construction.
//!
//! Every free-form section (notes, code, captured output) is cut to the
//! configured character budget before it is embedded.

use crate::domain::models::{GeneratedAsset, PromptConfig, RunResult, ServiceDescriptor};
use crate::domain::text::truncate_chars;

/// Builds the five prompts the agent sends to the backend.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_section_chars: usize,
}

impl PromptBuilder {
    pub const fn new(config: &PromptConfig) -> Self {
        Self {
            max_section_chars: config.max_section_chars,
        }
    }

    fn section(&self, text: &str) -> String {
        truncate_chars(text, self.max_section_chars)
    }

    /// Output sections get half the budget so code dominates the prompt.
    fn output_section(&self, text: &str) -> String {
        let text = if text.trim().is_empty() { "(empty)" } else { text };
        truncate_chars(text, self.max_section_chars / 2)
    }

    /// Ask for the catalog of UDP services described by the QA notes.
    pub fn identify_services(&self, notes: &str) -> String {
        format!(
            "You are reviewing QA notes that describe UDP-based services.\n\
             ---\n{notes}\n---\n\
             List every distinct UDP service that should be tested. For each one give a \
             descriptive name, its primary UDP port number and a one-line summary of the \
             messages it exchanges.\n\n\
             Use exactly this format for each service:\n\
             Service Name: <name>\n\
             Port: <port number>\n\
             Functionality Summary: <summary>\n\n\
             If no clear services can be identified, say so.\n",
            notes = self.section(notes),
        )
    }

    /// Ask for a standalone mock listener for `service`.
    pub fn mock_listener(&self, service: &ServiceDescriptor, context: &str) -> String {
        let port = service.port;
        format!(
            "Write a Python 3 mock UDP listener for the service '{name}' on port {port}, \
             whose behavior is: {functionality}.\n\
             QA context:\n---\n{context}\n---\n\
             Requirements:\n\
             - Use only the standard library 'socket' module.\n\
             - Bind to 0.0.0.0:{port} and receive datagrams in a loop.\n\
             - Print each received payload and the sender address to stdout.\n\
             - Where the QA context implies a reply, send it back to the sender's address; \
               use simple conditionals when different messages need different replies.\n\
             - Decode structured payloads (e.g. JSON) defensively and log decoding errors.\n\
             - Print \"Mock UDP listener started on 0.0.0.0:{port}\" once bound.\n\
             - Exit cleanly on SIGTERM or Ctrl+C.\n\n\
             Reply with the Python code only.\n",
            name = service.name,
            functionality = service.functionality,
            context = self.section(context),
        )
    }

    /// Ask for a unittest script exercising the given mock.
    pub fn test_script(&self, service: &ServiceDescriptor, context: &str, mock_code: &str) -> String {
        let port = service.port;
        format!(
            "Write a Python 3 unittest script that tests the UDP service '{name}' on \
             localhost port {port}, whose behavior is: {functionality}.\n\
             QA context:\n---\n{context}\n---\n\
             The following mock listener will be running on localhost:{port} during the tests:\n\
             ---\n{mock_code}\n---\n\
             Requirements:\n\
             - Use the 'unittest' and 'socket' modules only.\n\
             - Define one unittest.TestCase subclass; each test creates its own UDP socket.\n\
             - Send payloads suggested by the QA context, encoded as UTF-8 bytes.\n\
             - When a reply is expected, receive it with a 2 second timeout and assert on its \
               decoded content; a missing reply must fail the test.\n\
             - End with `if __name__ == '__main__': unittest.main(verbosity=2)`.\n\n\
             Reply with the Python code only.\n",
            name = service.name,
            functionality = service.functionality,
            context = self.section(context),
            mock_code = self.section(mock_code),
        )
    }

    /// Ask for a repair after a failed run.
    pub fn fix_failure(&self, asset: &GeneratedAsset, run: &RunResult, mock_logs: &str) -> String {
        format!(
            "A UDP test script failed against its mock listener (service '{name}', port {port}).\n\
             QA context:\n---\n{context}\n---\n\
             Current mock listener:\n---\n{mock}\n---\n\
             Current test script:\n---\n{test}\n---\n\
             Test exit code: {exit_code}{timed_out}\n\
             Test stdout:\n---\n{stdout}\n---\n\
             Test stderr:\n---\n{stderr}\n---\n\
             Mock listener output:\n---\n{mock_logs}\n---\n\
             Decide whether the fault is in the test script (payload, assertions, encoding, \
             timeouts) or in the mock (reply content, parsing, port binding) and fix it so the \
             tests pass according to the QA context.\n\n\
             Reply with a single JSON object and nothing else:\n\
             {{\"updated_mock\": <complete new mock code or null>, \
             \"updated_test\": <complete new test code or null>}}\n\
             Use null for a file that does not need to change. If you cannot produce JSON, \
             prefix the complete code with \"Updated Mock Code:\" or \
             \"Updated Test Script Code:\" instead.\n",
            name = asset.descriptor.name,
            port = asset.descriptor.port,
            context = self.section(&asset.context_snippet),
            mock = self.section(&asset.mock.content),
            test = self.section(&asset.test.content),
            exit_code = run.exit_code,
            timed_out = if run.timed_out { " (timed out)" } else { "" },
            stdout = self.output_section(&run.stdout),
            stderr = self.output_section(&run.stderr),
            mock_logs = self.output_section(mock_logs),
        )
    }

    /// Ask for additional edge-case tests once the main tests pass.
    pub fn edge_cases(&self, asset: &GeneratedAsset) -> String {
        let port = asset.descriptor.port;
        format!(
            "The tests for the UDP service '{name}' on port {port} now pass against its mock.\n\
             QA context:\n---\n{context}\n---\n\
             Mock listener:\n---\n{mock}\n---\n\
             Test script:\n---\n{test}\n---\n\
             Suggest additional edge cases and boundary conditions worth testing (empty or \
             oversized payloads, malformed messages, bursts). For each one:\n\
             1. Describe the case briefly.\n\
             2. Give a complete unittest test method that can be added to the existing test \
                class, targeting localhost port {port}.\n\
             3. If the mock must change to handle the case, give the complete updated mock \
                code; otherwise state that no mock changes are needed.\n",
            name = asset.descriptor.name,
            context = self.section(&asset.context_snippet),
            mock = self.section(&asset.mock.content),
            test = self.section(&asset.test.content),
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(&PromptConfig::default())
    }
}
