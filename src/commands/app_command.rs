use crate::form::MeasurementField;
use crate::submission::PendingSubmission;
use std::str::FromStr;

pub const HELP_TEXT: &str = "可用命令: predict | set <field> <value> | clear | health | help | quit  (字段: rainfall river_discharge water_level temperature humidity soil_type elevation latitude longitude station)";

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// 校验并提交当前表单（UI 侧处理）
    Predict,
    /// 已校验的请求，交给后台发送
    Dispatch(PendingSubmission),
    Set {
        field: MeasurementField,
        value: String,
    },
    Clear,
    Health,
    Help,
    Quit,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "predict" | "submit" => Ok(AppCommand::Predict),
            "set" => {
                // 字段名之后的文本原样作为值，不合并空白
                let args = s
                    .trim_start()
                    .strip_prefix("set")
                    .unwrap_or_default()
                    .trim_start();
                let (name, value) = match args.split_once(char::is_whitespace) {
                    Some((name, value)) => (name, value.trim_start()),
                    None => (args, ""),
                };
                if name.is_empty() {
                    return Ok(AppCommand::Unknown("用法: set <field> <value>".to_string()));
                }
                match name.parse::<MeasurementField>() {
                    Ok(field) => Ok(AppCommand::Set {
                        field,
                        value: value.to_string(),
                    }),
                    Err(e) => Ok(AppCommand::Unknown(e.to_string())),
                }
            }
            "clear" | "reset" => Ok(AppCommand::Clear),
            "health" | "ping" => Ok(AppCommand::Health),
            "help" | "?" => Ok(AppCommand::Help),
            "quit" | "exit" => Ok(AppCommand::Quit),
            other => Ok(AppCommand::Unknown(other.to_string())),
        }
    }
}
