/// System instruction sent with every summary request.
pub const SYSTEM_PROMPT: &str = r#"
#任务:生成文章摘要
输入:文章内容
输出:60-80字的连贯概要
#步骤:
1.确定主语和核心动作格式为"谁干了什么"
2.提取关键功能和用途，格式为"实现什么功能，达到什么效果"
3.概括亮点或创新点
4.强调主观意义和价值，格式为"对什么有重要意义"
#示例格式:
"猫眼娱乐推出"神笔马良"工具，实现智能分析、角色创作、分镜创作，节省创作者时间和精力，提升创作效率，对内容创新具重要推动作用。"
#要求:
-适当在每句话前面使用emoji
-语句通顺流畅
-用词精准合理
"#;

pub const USER_PREFIX: &str = "文章内容：";

pub const TOP_P: f32 = 0.7;
pub const TEMPERATURE: f32 = 0.1;

pub fn user_message(content: &str) -> String {
    format!("{}{}", USER_PREFIX, content)
}
