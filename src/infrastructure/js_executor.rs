//! JS 执行器 - 基础设施层
//!
//! 持有 page，暴露"执行 JS"的能力，并集中生成驱动使用的 DOM 脚本。

use crate::error::{AppError, AppResult, BrowserError};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// JS 执行器
///
/// 职责：
/// - 持有 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 Case / ResultRow
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result
            .into_value()
            .map_err(|e| AppError::Browser(BrowserError::ScriptExecutionFailed(e.to_string())))?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

// ========== DOM 脚本 ==========
// 所有脚本都返回非空值，避免 CDP 把 null 当成“没有返回值”。

/// 把字符串转成 JS 字面量
pub fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// 元素状态: "missing" / "hidden" / "visible"
pub fn element_state_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return "missing";
            const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            const visible = style.visibility !== "hidden" && style.display !== "none"
                && (rect.width > 0 || rect.height > 0);
            return visible ? "visible" : "hidden";
        }})()
        "#,
        sel = js_str(selector)
    )
}

/// 填写输入框并触发 input / change 事件
pub fn fill_script(selector: &str, text: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.focus();
            el.value = {text};
            el.dispatchEvent(new Event("input", {{ bubbles: true }}));
            el.dispatchEvent(new Event("change", {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = js_str(selector),
        text = js_str(text)
    )
}

/// 选择下拉选项（按 value，找不到时按文字）
pub fn select_option_script(selector: &str, value: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const wanted = {value};
            const option = Array.from(el.options).find(o => o.value === wanted)
                || Array.from(el.options).find(o => o.text.trim() === wanted);
            if (!option) return false;
            el.value = option.value;
            el.dispatchEvent(new Event("change", {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = js_str(selector),
        value = js_str(value)
    )
}

/// 读取属性: { found, value }
pub fn attribute_script(selector: &str, name: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return {{ found: false, value: null }};
            return {{ found: true, value: el.getAttribute({name}) }};
        }})()
        "#,
        sel = js_str(selector),
        name = js_str(name)
    )
}

/// 读取文字: { found, value }
pub fn text_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return {{ found: false, value: null }};
            return {{ found: true, value: (el.innerText || el.textContent || "").trim() }};
        }})()
        "#,
        sel = js_str(selector)
    )
}

/// 查询所有元素，并给每个元素打上 data-rpa-key 句柄
pub fn query_all_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const nodes = Array.from(document.querySelectorAll({sel}));
            return nodes.map(el => {{
                if (!el.dataset.rpaKey) {{
                    window.__rpaSeq = (window.__rpaSeq || 0) + 1;
                    el.dataset.rpaKey = "k" + window.__rpaSeq;
                }}
                const cells = Array.from(el.querySelectorAll(":scope > td, :scope > th"))
                    .map(c => (c.innerText || c.textContent || "").trim());
                return {{
                    key: el.dataset.rpaKey,
                    text: (el.innerText || el.textContent || "").trim(),
                    value: el.value === undefined ? null : String(el.value),
                    cells: cells
                }};
            }});
        }})()
        "#,
        sel = js_str(selector)
    )
}

/// 异步点击，脚本立即返回，用于会弹出原生对话框的按钮
pub fn deferred_click_script(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            setTimeout(() => el.click(), 0);
            return true;
        }})()
        "#,
        sel = js_str(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted_as_js_literals() {
        let script = fill_script(r#"input[name="clave"]"#, "a\"b");
        assert!(script.contains(r#""input[name=\"clave\"]""#));
        assert!(script.contains(r#""a\"b""#));
    }

    #[test]
    fn query_all_tags_nodes() {
        let script = query_all_script("#tabla tbody tr");
        assert!(script.contains("el.dataset.rpaKey"));
        assert!(script.contains("\"#tabla tbody tr\""));
    }
}
