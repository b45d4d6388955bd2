use crate::error::{AppResult, ConfigError};
use chrono::{Datelike, Local, Months, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 程序配置
///
/// 启动时加载一次，之后以 `Arc<Config>` 注入到各个组件，运行期间不可变。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 门户 ---
    /// 登录页地址
    pub login_url: String,
    /// 门户用户名
    pub username: String,
    /// 门户密码
    pub password: String,

    // --- 浏览器 ---
    /// 是否无头运行（生产环境为 true）
    pub headless: bool,
    /// 浏览器可执行文件，为空时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 连接已启动浏览器的调试端口，设置后不再启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 浏览器请求超时（毫秒）
    pub browser_timeout_ms: u64,

    // --- 等待时间 ---
    /// 状态按钮等待时间（毫秒）
    pub indicator_timeout_ms: u64,
    /// 搜索结果表格等待时间（毫秒）
    pub table_timeout_ms: u64,
    /// 弹窗内元素等待时间（毫秒）
    pub modal_timeout_ms: u64,
    /// 原生对话框等待时间（毫秒）
    pub dialog_timeout_ms: u64,

    // --- 目录 ---
    pub screenshot_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub logs_dir: PathBuf,

    // --- 数据源 ---
    /// 输入 Excel 文件
    pub input_file: PathBuf,
    /// 工作表名称，为空时使用第一个工作表
    pub sheet_name: Option<String>,
    pub columns: ColumnNames,

    /// 搜索表单的起始日期 (dd/mm/YYYY)
    pub search_from_date: String,

    pub selectors: Selectors,
    pub labels: PortalLabels,
    pub pacing: PacingConfig,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

/// 数据表列名
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub ndo: String,
    pub codigo_pami: String,
    pub document_url: String,
    pub processed: String,
    pub apellido: String,
    pub nombre: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            ndo: "NDO".to_string(),
            codigo_pami: "CODIGO_PAMI".to_string(),
            document_url: "URL_DOCUMENTO".to_string(),
            processed: "PROCESADO".to_string(),
            apellido: "APE".to_string(),
            nombre: "NOM".to_string(),
        }
    }
}

/// 门户页面选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    // 登录
    pub login_user: String,
    pub login_password: String,
    pub login_submit: String,
    pub login_error: String,
    /// 登录成功后出现的 OME 按钮，点击后打开工作区弹窗
    pub ome_button: String,
    pub panel_prestaciones: String,

    // 搜索
    pub search_ndo: String,
    pub search_date_from: String,
    pub search_button: String,
    pub result_rows: String,
    /// 编码所在列（从 0 开始）
    pub code_column: usize,

    // 行内状态按钮（相对于结果行）
    pub validation_button: String,
    pub upload_button: String,
    pub transmit_button: String,

    // 上传弹窗
    pub document_type_select: String,
    pub file_input: String,
    pub attachment_rows: String,
    pub modal_close: String,

    // 传输确认
    pub confirm_container: String,
    pub confirm_buttons: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_user: "input[name='usuario']".to_string(),
            login_password: "input[name='clave']".to_string(),
            login_submit: "button[type='submit']".to_string(),
            login_error: ".alert-danger".to_string(),
            ome_button: "a#btn_ome".to_string(),
            panel_prestaciones: "a#panel_prestaciones".to_string(),
            search_ndo: "input#nro_orden".to_string(),
            search_date_from: "input#fecha_desde".to_string(),
            search_button: "button#btn_buscar".to_string(),
            result_rows: "#tabla_prestaciones tbody tr".to_string(),
            code_column: 1,
            validation_button: ".btn-validacion".to_string(),
            upload_button: ".btn-adjuntar".to_string(),
            transmit_button: ".btn-transmitir".to_string(),
            document_type_select: "#modal_adjuntos select[name='tipo_documento']".to_string(),
            file_input: "#modal_adjuntos input[type='file']".to_string(),
            attachment_rows: "#modal_adjuntos table tbody tr".to_string(),
            modal_close: "#modal_adjuntos button.close".to_string(),
            confirm_container: "#modal_transmitir".to_string(),
            confirm_buttons: "#modal_transmitir button".to_string(),
        }
    }
}

/// 门户界面上的固定文字
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PortalLabels {
    /// 文档类型选项和附件列表中表示“报告”的文字
    pub report_marker: String,
    /// 传输确认按钮的文字
    pub confirm_label: String,
    /// 传输成功对话框中应包含的文字
    pub transmit_success_phrase: String,
    /// 登录失败时页面上可能出现的文字
    pub login_error_indicators: Vec<String>,
}

impl Default for PortalLabels {
    fn default() -> Self {
        Self {
            report_marker: "INFORME".to_string(),
            confirm_label: "Confirmar".to_string(),
            transmit_success_phrase: "transmitida correctamente".to_string(),
            login_error_indicators: vec![
                "usuario o contraseña incorrectos".to_string(),
                "error".to_string(),
                "acceso denegado".to_string(),
            ],
        }
    }
}

/// 随机延迟配置（毫秒）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub case_delay_min_ms: u64,
    pub case_delay_max_ms: u64,
    pub action_delay_min_ms: u64,
    pub action_delay_max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            case_delay_min_ms: 2000,
            case_delay_max_ms: 5000,
            action_delay_min_ms: 300,
            action_delay_max_ms: 900,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: "https://cup.pami.org.ar/controllers/loginController.php".to_string(),
            username: String::new(),
            password: String::new(),
            headless: false,
            chrome_executable: None,
            browser_debug_port: None,
            browser_timeout_ms: 30_000,
            indicator_timeout_ms: 5_000,
            table_timeout_ms: 15_000,
            modal_timeout_ms: 10_000,
            dialog_timeout_ms: 10_000,
            screenshot_dir: PathBuf::from("screenshots"),
            downloads_dir: PathBuf::from("downloads"),
            logs_dir: PathBuf::from("logs"),
            input_file: PathBuf::from("input_data/input.xlsx"),
            sheet_name: None,
            columns: ColumnNames::default(),
            search_from_date: first_day_of_previous_month(Local::now().date_naive()),
            selectors: Selectors::default(),
            labels: PortalLabels::default(),
            pacing: PacingConfig::default(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：先读取可选的 TOML 设置文件（缺省项使用默认值），再用环境变量覆盖
    pub fn load(settings_path: impl AsRef<Path>) -> AppResult<Self> {
        let path = settings_path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            Config::default()
        };
        config.apply_env()
    }

    /// 从环境变量创建配置
    pub fn from_env() -> AppResult<Self> {
        Config::default().apply_env()
    }

    /// 使用环境变量覆盖配置
    pub fn apply_env(mut self) -> AppResult<Self> {
        if let Ok(v) = std::env::var("LOGIN_URL") {
            self.login_url = v;
        }
        if let Ok(v) = std::env::var("PAMI_USER") {
            self.username = v;
        }
        if let Ok(v) = std::env::var("PAMI_PASSWORD") {
            self.password = v;
        }
        if let Ok(v) = std::env::var("INPUT_FILE") {
            self.input_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = parse_env::<bool>("HEADLESS", "bool")? {
            self.headless = v;
        }
        if let Some(v) = parse_env::<u16>("BROWSER_DEBUG_PORT", "u16")? {
            self.browser_debug_port = Some(v);
        }
        if let Some(v) = parse_env::<u64>("BROWSER_TIMEOUT_MS", "u64")? {
            self.browser_timeout_ms = v;
        }
        if let Some(v) = parse_env::<bool>("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        Ok(self)
    }

    /// 检查运行所需的配置项
    pub fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingValue("username".to_string()).into());
        }
        if self.password.trim().is_empty() {
            return Err(ConfigError::MissingValue("password".to_string()).into());
        }
        Ok(())
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    pub fn indicator_timeout(&self) -> Duration {
        Duration::from_millis(self.indicator_timeout_ms)
    }

    pub fn table_timeout(&self) -> Duration {
        Duration::from_millis(self.table_timeout_ms)
    }

    pub fn modal_timeout(&self) -> Duration {
        Duration::from_millis(self.modal_timeout_ms)
    }

    pub fn dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.dialog_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

/// 上个月的第一天，格式 dd/mm/YYYY
pub fn first_day_of_previous_month(today: NaiveDate) -> String {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let previous = first_of_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(first_of_month);
    previous.format("%d/%m/%Y").to_string()
}
