use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing_subscriber::EnvFilter;

use dslint::analyzer::Analyzer;
use dslint::autofix::apply_fix;
use dslint::config::Config;
use dslint::rules::{Issue, Severity};
use dslint::syntax::SyntaxDocument;

const SERVER_NAME: &str = "dslint";

pub struct Backend {
    client: Client,
    analyzer: RwLock<Analyzer>,
    documents: Mutex<HashMap<Url, String>>,
}

/// Converts byte offsets of one text into LSP positions (UTF-16 columns).
struct PositionMap<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> PositionMap<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    fn position(&self, byte: usize) -> Position {
        let line = match self.line_starts.binary_search(&byte) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let character = self.text[start..byte].encode_utf16().count();
        Position::new(line as u32, character as u32)
    }

    fn range(&self, span: &std::ops::Range<usize>) -> Range {
        Range::new(self.position(span.start), self.position(span.end))
    }
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let config = Config::load_or_default(Path::new("."));

        Self {
            client,
            analyzer: RwLock::new(Analyzer::new(config)),
            documents: Mutex::new(HashMap::new()),
        }
    }

    async fn text_of(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.documents.lock().await.get(uri) {
            return Some(text.clone());
        }
        let path = uri.to_file_path().ok()?;
        std::fs::read_to_string(path).ok()
    }

    async fn issues(&self, uri: &Url, text: &str) -> Vec<Issue> {
        let path = uri
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(uri.path()));
        let analyzer = self.analyzer.read().await;
        match analyzer.analyze_source(&path, text) {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "analysis failed");
                Vec::new()
            }
        }
    }

    fn diagnostic(issue: &Issue, positions: &PositionMap<'_>) -> Diagnostic {
        Diagnostic {
            range: positions.range(&issue.span),
            severity: Some(match issue.severity {
                Severity::Error => DiagnosticSeverity::ERROR,
                Severity::Warning => DiagnosticSeverity::WARNING,
                Severity::Info => DiagnosticSeverity::INFORMATION,
            }),
            code: Some(NumberOrString::String(issue.rule.to_string())),
            source: Some(SERVER_NAME.to_string()),
            message: issue.message.clone(),
            related_information: None,
            tags: None,
            code_description: None,
            data: None,
        }
    }

    async fn publish(&self, uri: Url, version: Option<i32>) {
        let Some(text) = self.text_of(&uri).await else {
            return;
        };
        let positions = PositionMap::new(&text);
        let diagnostics = self
            .issues(&uri, &text)
            .await
            .iter()
            .map(|issue| Self::diagnostic(issue, &positions))
            .collect();

        self.client.publish_diagnostics(uri, diagnostics, version).await;
    }
}

/// The smallest single replacement that turns `old` into `new`.
fn minimal_edit(old: &str, new: &str) -> (std::ops::Range<usize>, String) {
    let prefix: usize = old
        .chars()
        .zip(new.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    let suffix: usize = old[prefix..]
        .chars()
        .rev()
        .zip(new[prefix..].chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();

    (
        prefix..old.len() - suffix,
        new[prefix..new.len() - suffix].to_string(),
    )
}

fn overlaps(a: &Range, b: &Range) -> bool {
    a.start <= b.end && b.start <= a.end
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok());
        if let Some(root) = root {
            *self.analyzer.write().await = Analyzer::new(Config::load_or_default(&root));
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "dslint LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.documents
            .lock()
            .await
            .insert(document.uri.clone(), document.text);
        self.publish(document.uri, Some(document.version)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .lock()
                .await
                .insert(params.text_document.uri.clone(), change.text);
        }
        self.publish(params.text_document.uri, Some(params.text_document.version))
            .await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            self.documents
                .lock()
                .await
                .insert(params.text_document.uri.clone(), text);
        }
        self.publish(params.text_document.uri, None).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.lock().await.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = &params.text_document.uri;
        let Some(text) = self.text_of(uri).await else {
            return Ok(None);
        };
        let positions = PositionMap::new(&text);
        let issues = self.issues(uri, &text).await;

        let mut actions = Vec::new();
        for issue in &issues {
            let Some(fix) = &issue.fix else {
                continue;
            };
            let diagnostic = Self::diagnostic(issue, &positions);
            if !overlaps(&diagnostic.range, &params.range) {
                continue;
            }
            let fixed = match apply_fix(&text, fix) {
                Ok(fixed) => fixed,
                Err(reason) => {
                    tracing::debug!(rule = issue.rule, %reason, "dropping code action");
                    continue;
                }
            };

            let (span, new_text) = minimal_edit(&text, &fixed);
            let mut changes = HashMap::new();
            changes.insert(
                uri.clone(),
                vec![TextEdit {
                    range: positions.range(&span),
                    new_text,
                }],
            );

            actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                title: fix.title.clone(),
                kind: Some(CodeActionKind::QUICKFIX),
                diagnostics: Some(vec![diagnostic]),
                edit: Some(WorkspaceEdit {
                    changes: Some(changes),
                    document_changes: None,
                    change_annotations: None,
                }),
                command: None,
                is_preferred: Some(true),
                disabled: None,
                data: None,
            }));
        }

        Ok(Some(actions))
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Parsing once up front surfaces a grammar mismatch before the first request.
    if let Err(e) = SyntaxDocument::parse("") {
        tracing::error!(error = %e, "C# grammar unavailable");
        return;
    }

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_count_utf16_units() {
        let text = "a\n\u{1F600}b";
        let positions = PositionMap::new(text);
        let b = text.find('b').unwrap();
        assert_eq!(positions.position(b), Position::new(1, 2));
    }

    #[test]
    fn test_minimal_edit() {
        let (span, text) = minimal_edit("class C { int a; }", "class C { }");
        assert_eq!(span, 10..17);
        assert_eq!(text, "");

        let (span, text) = minimal_edit("same", "same");
        assert_eq!(span, 4..4);
        assert!(text.is_empty());
    }
}
