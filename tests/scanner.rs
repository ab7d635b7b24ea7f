#[cfg(test)]
mod scanner_tests {
    use loxide::scanner::*;
    use loxide::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_ternary_symbols() {
        assert_token_sequence(
            "a ? b : c",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::QUESTION, "?"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::COLON, ":"),
                (TokenType::IDENTIFIER, "c"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_keywords_and_identifiers() {
        assert_token_sequence(
            "var forest = fun_times; while this class",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "forest"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "fun_times"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::THIS, "this"),
                (TokenType::CLASS, "class"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_numbers_and_strings() {
        let scanner = Scanner::new(b"12 3.25 \"hello\"");
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 4);

        match &tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(*n, 12.0),
            other => panic!("expected NUMBER, got {:?}", other),
        }
        match &tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(*n, 3.25),
            other => panic!("expected NUMBER, got {:?}", other),
        }
        match &tokens[2].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello"),
            other => panic!("expected STRING, got {:?}", other),
        }
        assert_eq!(tokens[3].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_comments_and_lines() {
        let source = "// leading comment\nprint 1; // trailing\nprint 2;";
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].token_type, TokenType::PRINT);
        assert_eq!(tokens[3].line, 3);
        assert_eq!(tokens.last().map(|t| t.line), Some(3));
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let source = "\"one\ntwo\"\nprint";
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "one\ntwo"),
            other => panic!("expected STRING, got {:?}", other),
        }
        // The string swallowed one newline, the separator another.
        assert_eq!(tokens[1].token_type, TokenType::PRINT);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unexpected_chars_are_reported_and_skipped() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for error in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                error.to_string().contains("Unexpected character"),
                "Error message should name the unexpected character, got: {}",
                error
            );
        }

        let kinds: Vec<_> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|t| t.token_type.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::LEFT_PAREN,
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn test_token_display_format() {
        let scanner = Scanner::new(b"+ ident 3 2.5 \"hi\"");
        let rendered: Vec<String> = scanner
            .filter_map(Result::ok)
            .map(|t| t.to_string())
            .collect();

        assert_eq!(
            rendered,
            vec![
                "PLUS + null",
                "IDENTIFIER ident null",
                "NUMBER 3 3.0",
                "NUMBER 2.5 2.5",
                "STRING \"hi\" hi",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unterminated_string_still_tokenizes() {
        let scanner = Scanner::new(b"\"dangling");
        let results: Vec<_> = scanner.collect();

        // Partial token first, the deferred error next, then EOF.
        assert_eq!(results.len(), 3);

        match &results[0] {
            Ok(token) => match &token.token_type {
                TokenType::STRING(s) => assert_eq!(s, "dangling"),
                other => panic!("expected STRING, got {:?}", other),
            },
            Err(e) => panic!("expected partial string token, got error: {}", e),
        }

        match &results[1] {
            Err(error) => assert!(error.to_string().contains("Unterminated string")),
            Ok(token) => panic!("expected error, got token: {}", token),
        }

        match &results[2] {
            Ok(token) => assert_eq!(token.token_type, TokenType::EOF),
            Err(e) => panic!("expected EOF, got error: {}", e),
        }
    }
}
