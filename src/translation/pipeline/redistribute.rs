//! 译文回写
//!
//! 一个元素的译文按各直接文本段的原长度比例切分，依次写回每一段；
//! 最后一段吸收舍入误差，保证译文的每个字符恰好使用一次。长度以字符计。

use crate::parsers::html::dom::set_text;

use super::collector::TextRun;

/// 计算每段应得的字符数，总和恒等于 `total`
pub fn slice_lengths(total: usize, lengths: &[usize]) -> Vec<usize> {
    match lengths.len() {
        0 => Vec::new(),
        1 => vec![total],
        n => {
            let sum: usize = lengths.iter().sum();
            let mut remaining = total;
            let mut slices = Vec::with_capacity(n);

            for &len in &lengths[..n - 1] {
                let share = if sum == 0 {
                    0
                } else {
                    ((total as f64) * (len as f64) / (sum as f64)).round() as usize
                };
                let share = share.min(remaining);
                slices.push(share);
                remaining -= share;
            }

            slices.push(remaining);
            slices
        }
    }
}

/// 将译文按比例写回各文本段，首尾空白原样恢复
pub fn redistribute(runs: &[TextRun], translated: &str) {
    if runs.is_empty() {
        return;
    }

    let lengths: Vec<usize> = runs.iter().map(TextRun::char_len).collect();
    let total = translated.chars().count();
    let slices = slice_lengths(total, &lengths);

    let mut chars = translated.chars();
    for (run, take) in runs.iter().zip(slices) {
        let slice: String = chars.by_ref().take(take).collect();
        write_run(run, &slice);
    }
}

/// 写回单个文本段
pub fn write_run(run: &TextRun, translated: &str) {
    let value = format!("{}{}{}", run.leading, translated, run.trailing);
    set_text(&run.node, &value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_first_element, html_to_dom, text_content};
    use crate::translation::pipeline::collector::direct_text_runs;

    #[test]
    fn test_slice_lengths_sum_to_total() {
        assert_eq!(slice_lengths(10, &[]), Vec::<usize>::new());
        assert_eq!(slice_lengths(7, &[3]), vec![7]);
        assert_eq!(slice_lengths(10, &[5, 5]), vec![5, 5]);
        assert_eq!(slice_lengths(7, &[1, 1, 1]), vec![2, 2, 3]);
        assert_eq!(slice_lengths(2, &[10, 10, 10]), vec![1, 1, 0]);
        assert_eq!(slice_lengths(0, &[4, 2]), vec![0, 0]);

        for total in 0..40 {
            let slices = slice_lengths(total, &[3, 8, 1, 5]);
            assert_eq!(slices.iter().sum::<usize>(), total);
        }
    }

    #[test]
    fn test_redistribute_keeps_whitespace_and_markup() {
        let dom = html_to_dom(b"<p> Hello <b>big</b> world </p>", "utf-8").unwrap();
        let p = find_first_element(&dom.document, "p").unwrap();
        let runs = direct_text_runs(&p);

        redistribute(&runs, "你好世界啊");

        // 长度比 5:5，译文 5 个字符 -> 3 + 2
        assert_eq!(text_content(&p), " 你好世 big 界啊 ");
        assert!(find_first_element(&p, "b").is_some());
    }

    #[test]
    fn test_single_run_gets_everything() {
        let dom = html_to_dom(b"<p>\n Hi \n</p>", "utf-8").unwrap();
        let p = find_first_element(&dom.document, "p").unwrap();
        let runs = direct_text_runs(&p);

        redistribute(&runs, "Bonjour à tous");
        assert_eq!(text_content(&p), "\n Bonjour à tous \n");
    }
}
