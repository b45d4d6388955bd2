//! 测试用的门户、数据源和下载器
#![allow(dead_code)]

use async_trait::async_trait;
use pami_auto::clients::DocumentFetcher;
use pami_auto::config::{Config, Selectors};
use pami_auto::dataset::{is_processed_mark, DatasetGateway, MarkResult, FAILED_MARK, PROCESSED_MARK};
use pami_auto::error::{AppError, AppResult, BrowserError};
use pami_auto::infrastructure::{NodeSnapshot, PageDriver, WaitState};
use pami_auto::models::{Case, NaturalKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const CONFIRM_KEY: &str = "confirm-ok";
pub const SUCCESS_DIALOG: &str = "La prestación fue transmitida correctamente";

/// 测试配置：所有目录放在临时目录下
pub fn test_config(dir: &Path) -> Config {
    Config {
        username: "usuario".to_string(),
        password: "clave".to_string(),
        screenshot_dir: dir.join("screenshots"),
        downloads_dir: dir.join("downloads"),
        logs_dir: dir.join("logs"),
        input_file: dir.join("input.xlsx"),
        ..Config::default()
    }
}

// ========== 门户 ==========

/// 门户上的一行结果
#[derive(Debug, Clone)]
pub struct FakeRow {
    pub key: String,
    pub cells: Vec<String>,
    pub validation_class: Option<String>,
    pub upload_class: Option<String>,
    pub upload_works: bool,
    /// 上传成功后上传按钮变为蓝色
    pub turns_blue: bool,
    pub dialog_message: String,
    /// 读取验证按钮的 class 时页面脚本出错
    pub validation_unreadable: bool,
    /// 读取上传按钮的 class 时页面脚本出错
    pub upload_unreadable: bool,
}

impl FakeRow {
    /// 默认状态：需要上传文档
    pub fn new(key: &str, code_text: &str) -> Self {
        Self {
            key: key.to_string(),
            cells: vec!["01/09/2026".to_string(), code_text.to_string()],
            validation_class: Some("btn btn-xs btn-primary".to_string()),
            upload_class: Some("btn btn-xs btn-default".to_string()),
            upload_works: true,
            turns_blue: true,
            dialog_message: SUCCESS_DIALOG.to_string(),
            validation_unreadable: false,
            upload_unreadable: false,
        }
    }

    pub fn validation(mut self, class: Option<&str>) -> Self {
        self.validation_class = class.map(str::to_string);
        self
    }

    pub fn upload(mut self, class: Option<&str>) -> Self {
        self.upload_class = class.map(str::to_string);
        self
    }

    pub fn upload_fails(mut self) -> Self {
        self.upload_works = false;
        self
    }

    pub fn stays_red(mut self) -> Self {
        self.turns_blue = false;
        self
    }

    pub fn dialog(mut self, message: &str) -> Self {
        self.dialog_message = message.to_string();
        self
    }

    pub fn validation_unreadable(mut self) -> Self {
        self.validation_unreadable = true;
        self
    }

    pub fn upload_unreadable(mut self) -> Self {
        self.upload_unreadable = true;
        self
    }
}

/// 门户上发生的操作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Search(String),
    OpenUpload(String),
    ChooseFile(String, PathBuf),
    CloseModal,
    Transmit(String),
    Screenshot(PathBuf),
}

#[derive(Default)]
struct PortalState {
    results: HashMap<String, Vec<FakeRow>>,
    broken_searches: Vec<String>,
    ndo_input: String,
    shown: Vec<FakeRow>,
    upload_modal: Option<String>,
    attachments: Vec<String>,
    confirm_for: Option<String>,
    login_submitted: bool,
    actions: Vec<Action>,
}

/// 内存中的门户，按默认选择器响应
#[derive(Clone)]
pub struct FakePortal {
    selectors: Selectors,
    state: Arc<Mutex<PortalState>>,
    credentials_ok: bool,
    stop_on_search: Option<CancellationToken>,
    /// 附件对话框既点不掉也按不掉
    stuck_modal: bool,
}

impl FakePortal {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::default(),
            state: Arc::new(Mutex::new(PortalState::default())),
            credentials_ok: true,
            stop_on_search: None,
            stuck_modal: false,
        }
    }

    /// 搜索某个 NDO 时返回的结果行
    pub fn with_results(self, ndo: &str, rows: Vec<FakeRow>) -> Self {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(ndo.to_string(), rows);
        self
    }

    /// 搜索某个 NDO 时读取表格出错
    pub fn with_broken_search(self, ndo: &str) -> Self {
        self.state.lock().unwrap().broken_searches.push(ndo.to_string());
        self
    }

    /// 关闭附件对话框的按钮和 Escape 都失败
    pub fn with_stuck_modal(mut self) -> Self {
        self.stuck_modal = true;
        self
    }

    pub fn with_bad_credentials(mut self) -> Self {
        self.credentials_ok = false;
        self
    }

    /// 第一次搜索时发出停止请求
    pub fn stop_on_search(mut self, cancel: CancellationToken) -> Self {
        self.stop_on_search = Some(cancel);
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Search(ndo) => Some(ndo),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Action) -> bool) -> usize {
        self.actions().iter().filter(|a| pred(*a)).count()
    }

    pub fn uploads(&self) -> usize {
        self.count(|a| matches!(a, Action::ChooseFile(..)))
    }

    pub fn transmits(&self) -> usize {
        self.count(|a| matches!(a, Action::Transmit(_)))
    }

    pub fn screenshots(&self) -> usize {
        self.count(|a| matches!(a, Action::Screenshot(_)))
    }

    /// `[data-rpa-key="k"] .sel` → ("k", ".sel")
    fn split_scope(selector: &str) -> Option<(String, String)> {
        let rest = selector.strip_prefix("[data-rpa-key=\"")?;
        let (key, suffix) = rest.split_once("\"]")?;
        Some((key.to_string(), suffix.trim().to_string()))
    }

    fn exists(&self, selector: &str) -> bool {
        let s = &self.selectors;
        let state = self.state.lock().unwrap();

        if let Some((key, suffix)) = Self::split_scope(selector) {
            if key == CONFIRM_KEY {
                return state.confirm_for.is_some();
            }
            let Some(row) = state.shown.iter().find(|r| r.key == key) else {
                return false;
            };
            return if suffix == s.validation_button {
                row.validation_class.is_some()
            } else if suffix == s.upload_button {
                row.upload_class.is_some()
            } else {
                suffix == s.transmit_button || suffix.is_empty()
            };
        }

        if selector == s.login_user || selector == s.login_password || selector == s.login_submit {
            true
        } else if selector == s.ome_button {
            state.login_submitted && self.credentials_ok
        } else if selector == s.login_error {
            state.login_submitted && !self.credentials_ok
        } else if selector == s.panel_prestaciones
            || selector == s.search_ndo
            || selector == s.search_date_from
            || selector == s.search_button
        {
            true
        } else if selector == s.result_rows {
            !state.shown.is_empty()
        } else if selector == s.document_type_select
            || selector == s.file_input
            || selector == s.modal_close
        {
            state.upload_modal.is_some()
        } else if selector == s.attachment_rows {
            state.upload_modal.is_some() && !state.attachments.is_empty()
        } else if selector == s.confirm_container {
            state.confirm_for.is_some()
        } else {
            false
        }
    }
}

impl Default for FakePortal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for FakePortal {
    async fn navigate(&self, _url: &str) -> AppResult<()> {
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        if selector == self.selectors.search_ndo {
            self.state.lock().unwrap().ndo_input = text.to_string();
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let s = &self.selectors;

        if selector == s.search_button {
            {
                let mut state = self.state.lock().unwrap();
                let ndo = state.ndo_input.clone();
                state.shown = state.results.get(&ndo).cloned().unwrap_or_default();
                state.upload_modal = None;
                state.confirm_for = None;
                state.actions.push(Action::Search(ndo));
            }
            if let Some(cancel) = &self.stop_on_search {
                cancel.cancel();
            }
            return Ok(());
        }
        if selector == s.login_submit {
            self.state.lock().unwrap().login_submitted = true;
            return Ok(());
        }
        if selector == s.modal_close {
            if self.stuck_modal {
                return Err(script_error("modal close handler threw"));
            }
            let mut state = self.state.lock().unwrap();
            state.upload_modal = None;
            state.actions.push(Action::CloseModal);
            return Ok(());
        }
        if let Some((key, suffix)) = Self::split_scope(selector) {
            let mut state = self.state.lock().unwrap();
            if !state.shown.iter().any(|r| r.key == key) {
                return Err(AppError::element_not_found(selector));
            }
            if suffix == s.upload_button {
                state.upload_modal = Some(key.clone());
                state.attachments.clear();
                state.actions.push(Action::OpenUpload(key));
            } else if suffix == s.transmit_button {
                state.confirm_for = Some(key);
            }
            return Ok(());
        }
        if self.exists(selector) {
            Ok(())
        } else {
            Err(AppError::element_not_found(selector))
        }
    }

    async fn select_option(&self, selector: &str, _value: &str) -> AppResult<()> {
        if self.exists(selector) {
            Ok(())
        } else {
            Err(AppError::element_not_found(selector))
        }
    }

    async fn wait_for(&self, selector: &str, state: WaitState, timeout: Duration) -> AppResult<()> {
        let present = self.exists(selector);
        let reached = match state {
            WaitState::Attached | WaitState::Visible => present,
            WaitState::Hidden => !present,
        };
        if reached {
            Ok(())
        } else {
            Err(AppError::timeout(selector, timeout.as_millis() as u64))
        }
    }

    async fn get_attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        let s = &self.selectors;
        let state = self.state.lock().unwrap();
        let row = Self::split_scope(selector)
            .and_then(|(key, suffix)| state.shown.iter().find(|r| r.key == key).map(|r| (r, suffix)));
        let Some((row, suffix)) = row else {
            return Err(AppError::element_not_found(selector));
        };
        if name != "class" {
            return Ok(None);
        }
        if (suffix == s.validation_button && row.validation_unreadable)
            || (suffix == s.upload_button && row.upload_unreadable)
        {
            return Err(script_error("Execution context was destroyed"));
        }
        let class = if suffix == s.validation_button {
            row.validation_class.clone()
        } else if suffix == s.upload_button {
            row.upload_class.clone()
        } else {
            Some("btn".to_string())
        };
        class
            .map(Some)
            .ok_or_else(|| AppError::element_not_found(selector))
    }

    async fn get_text(&self, selector: &str) -> AppResult<String> {
        if selector == self.selectors.login_error && self.exists(selector) {
            return Ok("Usuario o contraseña incorrectos".to_string());
        }
        Err(AppError::element_not_found(selector))
    }

    async fn query_all(&self, selector: &str) -> AppResult<Vec<NodeSnapshot>> {
        let s = &self.selectors;
        let state = self.state.lock().unwrap();

        if selector == s.result_rows {
            if state.broken_searches.contains(&state.ndo_input) {
                return Err(AppError::Browser(BrowserError::ScriptExecutionFailed(
                    "Cannot read properties of null".to_string(),
                )));
            }
            return Ok(state
                .shown
                .iter()
                .map(|r| NodeSnapshot {
                    key: r.key.clone(),
                    text: r.cells.join(" "),
                    value: None,
                    cells: r.cells.clone(),
                })
                .collect());
        }
        if selector == format!("{} option", s.document_type_select) && state.upload_modal.is_some() {
            return Ok(vec![
                node("opt-1", "RECETA", Some("1")),
                node("opt-7", "INFORME MEDICO", Some("7")),
            ]);
        }
        if selector == s.attachment_rows && state.upload_modal.is_some() {
            return Ok(state
                .attachments
                .iter()
                .enumerate()
                .map(|(i, text)| node(&format!("att-{}", i), text, None))
                .collect());
        }
        if selector == s.confirm_buttons && state.confirm_for.is_some() {
            return Ok(vec![
                node("confirm-cancel", "Cancelar", None),
                node(CONFIRM_KEY, "Confirmar", None),
            ]);
        }
        Ok(Vec::new())
    }

    async fn expect_popup(&self, trigger: &str, _timeout: Duration) -> AppResult<Box<dyn PageDriver>> {
        if !self.exists(trigger) {
            return Err(AppError::Browser(BrowserError::PopupNotOpened {
                trigger: trigger.to_string(),
            }));
        }
        Ok(Box::new(self.clone()))
    }

    async fn choose_file(&self, selector: &str, path: &Path) -> AppResult<()> {
        if !self.exists(selector) {
            return Err(AppError::element_not_found(selector));
        }
        let mut state = self.state.lock().unwrap();
        let Some(key) = state.upload_modal.clone() else {
            return Err(AppError::element_not_found(selector));
        };
        state
            .actions
            .push(Action::ChooseFile(key.clone(), path.to_path_buf()));

        let (works, turns_blue) = state
            .shown
            .iter()
            .find(|r| r.key == key)
            .map(|r| (r.upload_works, r.turns_blue))
            .unwrap_or((false, false));
        if works {
            state.attachments = vec!["INFORME MEDICO - informe.pdf".to_string()];
            if turns_blue {
                if let Some(row) = state.shown.iter_mut().find(|r| r.key == key) {
                    row.upload_class = Some("btn btn-xs btn-primary".to_string());
                }
            }
        }
        Ok(())
    }

    async fn expect_dialog(&self, trigger: &str, _timeout: Duration) -> AppResult<String> {
        let mut state = self.state.lock().unwrap();
        let confirm = format!("[data-rpa-key=\"{}\"]", CONFIRM_KEY);
        let Some(key) = state.confirm_for.clone().filter(|_| trigger == confirm) else {
            return Err(AppError::Browser(BrowserError::DialogNotOpened {
                trigger: trigger.to_string(),
            }));
        };
        state.confirm_for = None;
        state.actions.push(Action::Transmit(key.clone()));
        let message = state
            .shown
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.dialog_message.clone())
            .unwrap_or_default();
        Ok(message)
    }

    async fn press_key(&self, key: &str) -> AppResult<()> {
        if self.stuck_modal {
            return Err(script_error("keyboard dispatch failed"));
        }
        if key == "Escape" {
            self.state.lock().unwrap().upload_modal = None;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        self.state
            .lock()
            .unwrap()
            .actions
            .push(Action::Screenshot(path.to_path_buf()));
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

fn script_error(message: &str) -> AppError {
    AppError::Browser(BrowserError::ScriptExecutionFailed(message.to_string()))
}

fn node(key: &str, text: &str, value: Option<&str>) -> NodeSnapshot {
    NodeSnapshot {
        key: key.to_string(),
        text: text.to_string(),
        value: value.map(str::to_string),
        cells: Vec::new(),
    }
}

// ========== 数据源 ==========

/// 内存数据源，记录所有写回
#[derive(Default)]
pub struct MemoryDataset {
    rows: Mutex<Vec<(Case, String)>>,
    marks: Mutex<Vec<(NaturalKey, &'static str)>>,
}

impl MemoryDataset {
    pub fn new(cases: Vec<Case>) -> Self {
        Self {
            rows: Mutex::new(cases.into_iter().map(|c| (c, String::new())).collect()),
            marks: Mutex::new(Vec::new()),
        }
    }

    /// 预先带有某个状态值的记录
    pub fn with_status(self, case: Case, status: &str) -> Self {
        self.rows.lock().unwrap().push((case, status.to_string()));
        self
    }

    pub fn with_processed(self, case: Case) -> Self {
        self.rows
            .lock()
            .unwrap()
            .push((case, PROCESSED_MARK.to_string()));
        self
    }

    /// 从数据源中删除一行（模拟外部编辑）
    pub fn remove(&self, ndo: &str) {
        self.rows.lock().unwrap().retain(|(c, _)| c.ndo != ndo);
    }

    pub fn marks(&self) -> Vec<(NaturalKey, &'static str)> {
        self.marks.lock().unwrap().clone()
    }

    pub fn status_of(&self, ndo: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| c.ndo == ndo)
            .map(|(_, status)| status.clone())
    }

    fn mark(&self, key: &NaturalKey, value: &'static str) -> AppResult<MarkResult> {
        let mut rows = self.rows.lock().unwrap();
        let Some((_, status)) = rows
            .iter_mut()
            .find(|(c, _)| key.matches(&c.ndo, &c.codigo_pami))
        else {
            return Err(AppError::ExternalWriteFailure(format!("{} 不存在", key)));
        };
        self.marks.lock().unwrap().push((key.clone(), value));
        if status.as_str() == value {
            return Ok(MarkResult::AlreadyMarked);
        }
        *status = value.to_string();
        Ok(MarkResult::Marked)
    }
}

#[async_trait]
impl DatasetGateway for MemoryDataset {
    async fn load_unprocessed(&self) -> AppResult<Vec<Case>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, status)| !is_processed_mark(status))
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn already_processed(&self) -> AppResult<Vec<Case>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, status)| is_processed_mark(status))
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn mark_processed(&self, key: &NaturalKey) -> AppResult<MarkResult> {
        self.mark(key, PROCESSED_MARK)
    }

    async fn mark_failed(&self, key: &NaturalKey) -> AppResult<MarkResult> {
        self.mark(key, FAILED_MARK)
    }
}

// ========== 下载器 ==========

/// 记录下载请求，不访问网络
#[derive(Default)]
pub struct FakeFetcher {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeFetcher {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> AppResult<PathBuf> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(AppError::fetch_failed(url, "HTTP 404"));
        }
        Ok(dest.to_path_buf())
    }
}
