//! 选项字母解析
//!
//! 接受的形式：单个字母，大小写不限，后面可跟一个 `)` 或 `.`，前后空白忽略。
//! 例如 "b"、"B)"、"c." 解析为选项下标；其余输入（数字、多字母、空串）返回 None。

/// 将用户输入解析为 0 基选项下标
pub fn parse_option_letter(input: &str) -> Option<usize> {
    let clean = input.trim();
    let mut chars = clean.chars();

    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }

    match (chars.next(), chars.next()) {
        (None, _) => {}
        (Some(')'), None) | (Some('.'), None) => {}
        _ => return None,
    }

    Some(letter.to_ascii_uppercase() as usize - 'A' as usize)
}

/// 下标对应的选项字母（0 -> 'A'）
pub fn option_label(index: usize) -> char {
    (b'A' + index as u8) as char
}
